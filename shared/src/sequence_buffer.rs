use thiserror::Error;

use crate::sequence_greater_than;

/// Errors that can occur during SequenceBuffer operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceBufferError {
    /// The sequence number is older than anything the buffer can still hold
    #[error("Sequence {sequence} is too old for a buffer whose most recent sequence is {latest} and size is {size}")]
    TooOld { sequence: u16, latest: u16, size: usize },
}

/// A fixed-size window of entries keyed by wrapping 16 bit sequence numbers.
///
/// Each slot remembers the sequence it was written for, so a lookup for a
/// sequence that has since been overwritten by a newer one misses instead of
/// returning the wrong entry.
pub struct SequenceBuffer<T> {
    /// One past the most recent sequence inserted
    sequence: u16,
    entries: Vec<Option<(u16, T)>>,
}

impl<T> SequenceBuffer<T> {
    pub fn with_capacity(size: usize) -> Self {
        assert!(
            size > 0 && size <= 32768,
            "SequenceBuffer size must be in 1..=32768, got {}",
            size
        );
        let mut entries = Vec::with_capacity(size);
        entries.resize_with(size, || None);
        Self {
            sequence: 0,
            entries,
        }
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// One past the most recent sequence inserted
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    pub fn reset(&mut self) {
        self.sequence = 0;
        for entry in self.entries.iter_mut() {
            *entry = None;
        }
    }

    fn index(&self, sequence: u16) -> usize {
        usize::from(sequence) % self.entries.len()
    }

    /// Inserts `value` at `sequence`, replacing whatever occupied its slot.
    /// Inserting ahead of the current sequence clears the slots skipped over.
    pub fn insert(&mut self, sequence: u16, value: T) -> Result<&mut T, SequenceBufferError> {
        let size = self.size();
        if sequence_greater_than(sequence.wrapping_add(1), self.sequence) {
            self.remove_range(self.sequence, sequence);
            self.sequence = sequence.wrapping_add(1);
        } else if usize::from(self.sequence.wrapping_sub(sequence)) > size {
            return Err(SequenceBufferError::TooOld {
                sequence,
                latest: self.sequence.wrapping_sub(1),
                size,
            });
        }

        let index = self.index(sequence);
        let (_, value) = self.entries[index].insert((sequence, value));
        Ok(value)
    }

    /// Clears every slot for the sequences `start..=finish`
    fn remove_range(&mut self, start: u16, finish: u16) {
        let count = usize::from(finish.wrapping_sub(start)) + 1;
        if count >= self.size() {
            for entry in self.entries.iter_mut() {
                *entry = None;
            }
            return;
        }
        let mut sequence = start;
        for _ in 0..count {
            let index = self.index(sequence);
            self.entries[index] = None;
            sequence = sequence.wrapping_add(1);
        }
    }

    pub fn remove(&mut self, sequence: u16) -> Option<T> {
        let index = self.index(sequence);
        match &self.entries[index] {
            Some((stored, _)) if *stored == sequence => {
                self.entries[index].take().map(|(_, value)| value)
            }
            _ => None,
        }
    }

    /// Whether the slot `sequence` maps to is free, regardless of which
    /// sequence last used it
    pub fn available(&self, sequence: u16) -> bool {
        self.entries[self.index(sequence)].is_none()
    }

    pub fn exists(&self, sequence: u16) -> bool {
        self.find(sequence).is_some()
    }

    pub fn find(&self, sequence: u16) -> Option<&T> {
        match &self.entries[self.index(sequence)] {
            Some((stored, value)) if *stored == sequence => Some(value),
            _ => None,
        }
    }

    pub fn find_mut(&mut self, sequence: u16) -> Option<&mut T> {
        let index = self.index(sequence);
        match &mut self.entries[index] {
            Some((stored, value)) if *stored == sequence => Some(value),
            _ => None,
        }
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(Option::is_none)
    }
}
