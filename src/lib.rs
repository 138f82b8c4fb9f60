pub mod confport;
pub mod err;
pub mod mems;
pub mod regs;
pub mod transcode;

pub use confport::*;
pub use err::*;
pub use mems::*;
pub use regs::*;
