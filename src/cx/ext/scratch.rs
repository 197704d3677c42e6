//! Scratchpad register-file extension.
//!
//! The simplest useful extension: `sets` banks of `words` word-wide
//! registers, readable and writable with no side effects. Handy as a
//! software mailbox and as the reference module for protocol tests.

use std::sync::Mutex;

use crate::cx::csr::CxWord;
use crate::cx::registry::{CxExtension, ExtError, ExtResult};

/// Register-file extension with `sets x words` geometry.
///
/// The banks sit behind a `Mutex` because one instance may be reached from
/// several harts through the shared registry. Accesses are single-word and
/// non-blocking, so contention is bounded by the critical section of one
/// vector read/write.
pub struct ScratchExt {
    sets: usize,
    words: usize,
    banks: Mutex<Vec<Vec<CxWord>>>,
}

impl ScratchExt {
    /// Create a scratchpad with the given geometry, all words zero.
    pub fn new(sets: usize, words: usize) -> Self {
        Self {
            sets,
            words,
            banks: Mutex::new(vec![vec![0; words]; sets]),
        }
    }

    /// Number of register sets.
    #[inline]
    pub fn sets(&self) -> usize {
        self.sets
    }

    /// Number of words per set.
    #[inline]
    pub fn words(&self) -> usize {
        self.words
    }

    fn check_window(&self, set: CxWord, index: CxWord) -> ExtResult<(usize, usize)> {
        let set = usize::try_from(set).map_err(|_| ExtError::BadSetSelector)?;
        if set >= self.sets {
            return Err(ExtError::BadSetSelector);
        }
        let index = usize::try_from(index).map_err(|_| ExtError::BadIndex)?;
        if index >= self.words {
            return Err(ExtError::BadIndex);
        }
        Ok((set, index))
    }
}

impl CxExtension for ScratchExt {
    fn name(&self) -> &'static str {
        "scratch"
    }

    fn read(&self, set: CxWord, index: CxWord) -> ExtResult<CxWord> {
        let (set, index) = self.check_window(set, index)?;
        let banks = match self.banks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(banks[set][index])
    }

    fn write(&self, set: CxWord, index: CxWord, value: CxWord) -> ExtResult<()> {
        let (set, index) = self.check_window(set, index)?;
        let mut banks = match self.banks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        banks[set][index] = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_zeroed() {
        let ext = ScratchExt::new(2, 4);
        for set in 0..2 {
            for idx in 0..4 {
                assert_eq!(ext.read(set, idx), Ok(0));
            }
        }
    }

    #[test]
    fn test_write_then_read() {
        let ext = ScratchExt::new(1, 16);
        ext.write(0, 3, 0x42).unwrap();
        assert_eq!(ext.read(0, 3), Ok(0x42));
        // Neighbors untouched
        assert_eq!(ext.read(0, 2), Ok(0));
        assert_eq!(ext.read(0, 4), Ok(0));
    }

    #[test]
    fn test_sets_are_independent() {
        let ext = ScratchExt::new(3, 8);
        ext.write(0, 5, 11).unwrap();
        ext.write(2, 5, 22).unwrap();
        assert_eq!(ext.read(0, 5), Ok(11));
        assert_eq!(ext.read(1, 5), Ok(0));
        assert_eq!(ext.read(2, 5), Ok(22));
    }

    #[test]
    fn test_bad_set_selector() {
        let ext = ScratchExt::new(2, 8);
        assert_eq!(ext.read(2, 0), Err(ExtError::BadSetSelector));
        assert_eq!(ext.write(9, 0, 1), Err(ExtError::BadSetSelector));
        // Huge values don't wrap into range
        assert_eq!(ext.read(u64::MAX, 0), Err(ExtError::BadSetSelector));
    }

    #[test]
    fn test_bad_index() {
        let ext = ScratchExt::new(1, 16);
        assert_eq!(ext.read(0, 16), Err(ExtError::BadIndex));
        assert_eq!(ext.write(0, u64::MAX, 1), Err(ExtError::BadIndex));
    }

    #[test]
    fn test_rejected_write_has_no_effect() {
        let ext = ScratchExt::new(1, 4);
        ext.write(0, 0, 7).unwrap();
        assert_eq!(ext.write(0, 4, 99), Err(ExtError::BadIndex));
        assert_eq!(ext.read(0, 0), Ok(7));
    }
}
