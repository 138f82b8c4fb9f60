pub mod endian;
pub mod table;

pub use endian::*;
pub use table::*;
