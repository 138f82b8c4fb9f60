// Memory windows
//
// The configuration port is reached through a raw physical window, mapped
// from /dev/mem. Everything above this module only sees a byte-addressable
// `MemoryWindow`, so the same register logic runs on the real device and on
// an in-memory window.
pub mod devmem;
pub mod window;

pub use devmem::*;
pub use window::*;
