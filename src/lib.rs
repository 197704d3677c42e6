//! cx-emu library
//!
//! Emulation core for the RISC-V Composable Extensions (CX) indirect CSR
//! window: the selector/set-selector/index/data register quartet through
//! which extension register spaces are accessed indirectly.

pub mod config;
pub mod cx;
