//! Multiply-accumulate extension.
//!
//! A one-set functional unit with a handful of registers:
//!
//! ```text
//! index 0  status   (read-only: number of MAC commands executed)
//! index 1  operand A
//! index 2  operand B
//! index 3  accumulator, low word
//! index 4  accumulator, high word
//! index 5  control   (write-only commands: 1 = MAC, 2 = CLEAR)
//! ```
//!
//! A MAC command adds `A * B` (full 128-bit product) into the accumulator.
//! Writes to the status register and unknown control commands come back as
//! extension faults with a distinct status word, which is what the engine
//! surfaces as `ExtensionFault` - this unit exists mostly to exercise that
//! path end to end.

use std::sync::Mutex;

use crate::cx::csr::CxWord;
use crate::cx::registry::{CxExtension, ExtError, ExtResult};

/// Status register index (read-only).
pub const REG_STATUS: CxWord = 0;
/// Operand A register index.
pub const REG_OP_A: CxWord = 1;
/// Operand B register index.
pub const REG_OP_B: CxWord = 2;
/// Accumulator low-word register index.
pub const REG_ACC_LO: CxWord = 3;
/// Accumulator high-word register index.
pub const REG_ACC_HI: CxWord = 4;
/// Control register index (write-only).
pub const REG_CTRL: CxWord = 5;

/// Control command: multiply A by B and add into the accumulator.
pub const CTRL_MAC: CxWord = 1;
/// Control command: clear the accumulator.
pub const CTRL_CLEAR: CxWord = 2;

/// Fault status: write attempted to the read-only status register.
pub const STATUS_READ_ONLY: u32 = 0x0000_0001;
/// Fault status: unknown control command.
pub const STATUS_BAD_COMMAND: u32 = 0x0000_0002;
/// Fault status: read attempted from the write-only control register.
pub const STATUS_WRITE_ONLY: u32 = 0x0000_0003;

/// The unit only has set 0.
const NUM_SETS: CxWord = 1;
/// Registers 0..=5.
const NUM_REGS: CxWord = 6;

#[derive(Debug, Default)]
struct MacState {
    op_a: CxWord,
    op_b: CxWord,
    acc: u128,
    macs: u64,
}

/// Multiply-accumulate extension unit.
pub struct MulAccExt {
    state: Mutex<MacState>,
}

impl MulAccExt {
    /// Create the unit with a cleared accumulator.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MacState::default()),
        }
    }

    fn check_window(set: CxWord, index: CxWord) -> ExtResult<()> {
        if set >= NUM_SETS {
            return Err(ExtError::BadSetSelector);
        }
        if index >= NUM_REGS {
            return Err(ExtError::BadIndex);
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MacState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for MulAccExt {
    fn default() -> Self {
        Self::new()
    }
}

impl CxExtension for MulAccExt {
    fn name(&self) -> &'static str {
        "mulacc"
    }

    fn read(&self, set: CxWord, index: CxWord) -> ExtResult<CxWord> {
        Self::check_window(set, index)?;
        let state = self.lock();
        match index {
            REG_STATUS => Ok(state.macs),
            REG_OP_A => Ok(state.op_a),
            REG_OP_B => Ok(state.op_b),
            REG_ACC_LO => Ok(state.acc as CxWord),
            REG_ACC_HI => Ok((state.acc >> 64) as CxWord),
            REG_CTRL => Err(ExtError::Fault(STATUS_WRITE_ONLY)),
            _ => Err(ExtError::BadIndex),
        }
    }

    fn write(&self, set: CxWord, index: CxWord, value: CxWord) -> ExtResult<()> {
        Self::check_window(set, index)?;
        let mut state = self.lock();
        match index {
            REG_STATUS => Err(ExtError::Fault(STATUS_READ_ONLY)),
            REG_OP_A => {
                state.op_a = value;
                Ok(())
            }
            REG_OP_B => {
                state.op_b = value;
                Ok(())
            }
            REG_ACC_LO => {
                state.acc = (state.acc & !(u64::MAX as u128)) | u128::from(value);
                Ok(())
            }
            REG_ACC_HI => {
                state.acc = (state.acc & u128::from(u64::MAX)) | (u128::from(value) << 64);
                Ok(())
            }
            REG_CTRL => match value {
                CTRL_MAC => {
                    let product = u128::from(state.op_a) * u128::from(state.op_b);
                    state.acc = state.acc.wrapping_add(product);
                    state.macs += 1;
                    Ok(())
                }
                CTRL_CLEAR => {
                    state.acc = 0;
                    Ok(())
                }
                _ => Err(ExtError::Fault(STATUS_BAD_COMMAND)),
            },
            _ => Err(ExtError::BadIndex),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_accumulates() {
        let ext = MulAccExt::new();
        ext.write(0, REG_OP_A, 6).unwrap();
        ext.write(0, REG_OP_B, 7).unwrap();
        ext.write(0, REG_CTRL, CTRL_MAC).unwrap();
        assert_eq!(ext.read(0, REG_ACC_LO), Ok(42));
        assert_eq!(ext.read(0, REG_ACC_HI), Ok(0));

        // Second MAC adds on top
        ext.write(0, REG_CTRL, CTRL_MAC).unwrap();
        assert_eq!(ext.read(0, REG_ACC_LO), Ok(84));
        assert_eq!(ext.read(0, REG_STATUS), Ok(2));
    }

    #[test]
    fn test_wide_product_reaches_high_word() {
        let ext = MulAccExt::new();
        ext.write(0, REG_OP_A, 1 << 40).unwrap();
        ext.write(0, REG_OP_B, 1 << 40).unwrap();
        ext.write(0, REG_CTRL, CTRL_MAC).unwrap();
        // 2^80 = high word 2^16, low word 0
        assert_eq!(ext.read(0, REG_ACC_LO), Ok(0));
        assert_eq!(ext.read(0, REG_ACC_HI), Ok(1 << 16));
    }

    #[test]
    fn test_clear() {
        let ext = MulAccExt::new();
        ext.write(0, REG_OP_A, 3).unwrap();
        ext.write(0, REG_OP_B, 5).unwrap();
        ext.write(0, REG_CTRL, CTRL_MAC).unwrap();
        ext.write(0, REG_CTRL, CTRL_CLEAR).unwrap();
        assert_eq!(ext.read(0, REG_ACC_LO), Ok(0));
        assert_eq!(ext.read(0, REG_ACC_HI), Ok(0));
        // Clear resets the accumulator, not the op count
        assert_eq!(ext.read(0, REG_STATUS), Ok(1));
    }

    #[test]
    fn test_accumulator_writable_directly() {
        let ext = MulAccExt::new();
        ext.write(0, REG_ACC_LO, 0x1111).unwrap();
        ext.write(0, REG_ACC_HI, 0x2222).unwrap();
        assert_eq!(ext.read(0, REG_ACC_LO), Ok(0x1111));
        assert_eq!(ext.read(0, REG_ACC_HI), Ok(0x2222));
    }

    #[test]
    fn test_status_is_read_only() {
        let ext = MulAccExt::new();
        assert_eq!(
            ext.write(0, REG_STATUS, 1),
            Err(ExtError::Fault(STATUS_READ_ONLY))
        );
    }

    #[test]
    fn test_control_is_write_only() {
        let ext = MulAccExt::new();
        assert_eq!(
            ext.read(0, REG_CTRL),
            Err(ExtError::Fault(STATUS_WRITE_ONLY))
        );
    }

    #[test]
    fn test_unknown_command_faults() {
        let ext = MulAccExt::new();
        assert_eq!(
            ext.write(0, REG_CTRL, 99),
            Err(ExtError::Fault(STATUS_BAD_COMMAND))
        );
    }

    #[test]
    fn test_window_bounds() {
        let ext = MulAccExt::new();
        assert_eq!(ext.read(1, REG_STATUS), Err(ExtError::BadSetSelector));
        assert_eq!(ext.read(0, 6), Err(ExtError::BadIndex));
        assert_eq!(ext.write(0, 6, 0), Err(ExtError::BadIndex));
    }
}
