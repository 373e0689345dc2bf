//! FrameQueue trait - Output queue abstraction
//!
//! Defines a unified interface for per-stream output queues, decoupling the
//! sample reader from concrete device implementations.
//! Supports unified handling of mock and replay devices, and whatever real
//! runtime is plugged in behind the same trait.

use crate::{FramePacket, RigError};

/// Per-stream frame source trait
///
/// One instance corresponds to one named output queue of a running pipeline.
/// Queues hold at most one frame: a producer writing into a full queue
/// replaces the buffered frame (most-recent-wins), so a reader only ever
/// observes the latest delivery.
///
/// # Design Principles
///
/// 1. **Pull model**: callers poll; the device side never calls back
/// 2. **Unified Interface**: mock, replay, and real queues share the same API
/// 3. **Exclusive reader**: one consumer per queue; concurrent polling of the
///    same queue is a caller bug and must be serialized upstream
///
/// # Example
///
/// ```ignore
/// let queue: Box<dyn FrameQueue> = device.open_queue("rgb")?;
/// match queue.try_recv()? {
///     Some(packet) => println!("frame at t={}", packet.timestamp),
///     None => println!("nothing new"),
/// }
/// ```
pub trait FrameQueue: Send {
    /// Stream name this queue serves
    fn stream(&self) -> &str;

    /// Wait for the next frame.
    ///
    /// Blocks until a frame is buffered. Returns `RigError::QueueClosed`
    /// once the producer side is gone and the buffer is drained.
    fn recv(&self) -> Result<FramePacket, RigError>;

    /// Take the buffered frame without waiting.
    ///
    /// `Ok(None)` means no new frame since the last take. Returns
    /// `RigError::QueueClosed` once the producer side is gone and the
    /// buffer is drained.
    fn try_recv(&self) -> Result<Option<FramePacket>, RigError>;
}

/// Boxed queue handle as returned by device runtimes
pub type SharedFrameQueue = Box<dyn FrameQueue>;
