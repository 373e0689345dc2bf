//! Device runtime abstraction
//!
//! Defines the trait a pipeline-executing device must implement, supporting
//! mock and replay backends behind one interface.

use std::future::Future;

use contracts::{PipelineTopology, SharedFrameQueue};

use crate::error::Result;

/// Device runtime trait
///
/// Abstracts the device that executes a `PipelineTopology` and serves its
/// output taps as named queues. The same interface covers the mock backend,
/// recorded-session replay, and whatever physical runtime gets plugged in
/// later.
pub trait DeviceRuntime: Send + Sync {
    /// Backend name for logs and diagnostics
    fn backend(&self) -> &'static str;

    /// Upload the topology and start the pipeline
    ///
    /// The runtime owns a copy of the topology until `close`. Queues opened
    /// before a re-boot keep serving the previous session.
    fn boot(&mut self, topology: &PipelineTopology) -> impl Future<Output = Result<()>> + Send;

    /// Open one named output queue
    ///
    /// # Arguments
    /// * `stream` - Tap name declared via `PipelineTopology::expose`
    ///
    /// # Returns
    /// A capacity-1 queue handle. The producer side overwrites the buffered
    /// frame when the reader lags, so the handle always serves the most
    /// recent delivery. One reader per queue.
    fn open_queue(&self, stream: &str) -> impl Future<Output = Result<SharedFrameQueue>> + Send;

    /// Whether the pipeline is currently running
    fn is_running(&self) -> bool;

    /// Stop the pipeline and release the device
    ///
    /// Idempotent operation: closing an already-closed device returns Ok.
    /// Open queue handles report `QueueClosed` once drained.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}
