//! Merged iteration over the write buffer and the snapshot view
//!
//! Two ascending streams merge into one: buffered entries shadow snapshot
//! entries on equal keys, and a buffered tombstone (empty value) suppresses
//! the key from the merged view entirely.

use std::iter::Peekable;
use std::vec;

use unionkv_core::{Key, Value};

/// Ascending merge of buffered entries over snapshot entries
///
/// Both inputs must already be in ascending key order; the buffer side may
/// contain tombstones, the snapshot side may not.
pub struct UnionIter<'a> {
    buffer: Peekable<Box<dyn Iterator<Item = (Key, Value)> + 'a>>,
    snapshot: Peekable<vec::IntoIter<(Key, Value)>>,
}

impl<'a> UnionIter<'a> {
    /// Merge `buffer` (may contain tombstones) over `snapshot_entries`
    pub fn new(
        buffer: Box<dyn Iterator<Item = (Key, Value)> + 'a>,
        snapshot_entries: Vec<(Key, Value)>,
    ) -> Self {
        Self {
            buffer: buffer.peekable(),
            snapshot: snapshot_entries.into_iter().peekable(),
        }
    }
}

impl Iterator for UnionIter<'_> {
    type Item = (Key, Value);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let from_buffer = match (self.buffer.peek(), self.snapshot.peek()) {
                (None, None) => return None,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (Some((bk, _)), Some((sk, _))) => {
                    if bk == sk {
                        // Buffered entry shadows the snapshot entry.
                        self.snapshot.next();
                        true
                    } else {
                        bk < sk
                    }
                }
            };

            if from_buffer {
                let (key, value) = self.buffer.next().expect("peeked entry");
                if value.is_empty() {
                    // Tombstone: the key is deleted in this view.
                    continue;
                }
                return Some((key, value));
            }
            return self.snapshot.next();
        }
    }
}
