//! Sink implementations
//!
//! Contains LogSink, FileSink, and UdpSink.

mod file;
mod log;
mod udp;

pub use self::file::FileSink;
pub use self::log::LogSink;
pub use self::udp::UdpSink;
