//! Per-table auto-increment sequence.

use tabula_common::SEQUENCE_START;

/// Monotonic counter for auto-increment columns.
///
/// Values are never handed out twice, even after the rows holding them
/// are deleted. On load the counter is recovered as `max(existing) + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sequence {
    next: u64,
}

impl Sequence {
    /// Creates a sequence starting at the first value.
    pub fn new() -> Self {
        Self {
            next: SEQUENCE_START,
        }
    }

    /// Returns the value the next insert will receive.
    pub fn current(&self) -> u64 {
        self.next
    }

    /// Consumes the current value.
    pub fn advance(&mut self) -> u64 {
        let value = self.next;
        self.next = self.next.saturating_add(1);
        value
    }

    /// Moves the counter past a value already present on disk.
    ///
    /// Returns `false` if no value follows `existing`.
    pub fn observe(&mut self, existing: u64) -> bool {
        match existing.checked_add(1) {
            Some(next) => {
                self.next = self.next.max(next);
                true
            }
            None => false,
        }
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_advance() {
        let mut seq = Sequence::new();
        assert_eq!(seq.current(), 1);
        assert_eq!(seq.advance(), 1);
        assert_eq!(seq.advance(), 2);
        assert_eq!(seq.current(), 3);
    }

    #[test]
    fn test_sequence_observe_never_moves_backwards() {
        let mut seq = Sequence::new();
        assert!(seq.observe(7));
        assert!(seq.observe(3));
        assert_eq!(seq.current(), 8);
    }

    #[test]
    fn test_sequence_observe_last_value() {
        let mut seq = Sequence::new();
        assert!(seq.observe(u64::MAX - 1));
        assert_eq!(seq.current(), u64::MAX);
        assert!(!seq.observe(u64::MAX));
        assert_eq!(seq.current(), u64::MAX);
    }
}
