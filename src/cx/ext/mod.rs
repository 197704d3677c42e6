//! Bundled extension models.
//!
//! These are small, self-contained [`CxExtension`](crate::cx::CxExtension)
//! implementations used by the CLI demo and the test suite. They are not
//! models of any published extension architecture; they exist to exercise
//! the indirection protocol end to end:
//!
//! - [`scratch::ScratchExt`] - a plain `sets x words` register file.
//! - [`mulacc::MulAccExt`] - a multiply-accumulate unit with a read-only
//!   status register, demonstrating extension-defined fault statuses.

pub mod mulacc;
pub mod scratch;

pub use mulacc::MulAccExt;
pub use scratch::ScratchExt;
