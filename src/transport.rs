//! Byte-level plumbing: length-prefixed framing over any async stream and
//! the TCP specifics (bind, dial, split) used by the session manager.

pub mod frame;
pub mod tcp;

pub use frame::{FrameReader, FrameWriter};
pub use tcp::TcpTransport;
