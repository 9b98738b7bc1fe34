//! The wire codec: length-encoded primitives (`decode`/`encode`), the
//! capability bitset, and the packet-level dispatch (`packet`).

pub mod capabilities;
pub mod decode;
pub mod encode;
pub mod hexdump;
pub mod packet;

pub use capabilities::Capabilities;
