//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Uses device timestamps (seconds, f64) as primary clock
//! - `sequence` is optional, used for ordering/diagnostics

mod blueprint;
mod error;
mod frame;
mod frame_queue;
mod sample;
mod sampler_config;
mod sink;
mod stream_id;
mod topology;

pub use blueprint::*;
pub use error::*;
pub use frame::*;
pub use frame_queue::{FrameQueue, SharedFrameQueue};
pub use sample::*;
pub use sampler_config::*;
pub use sink::*;
pub use stream_id::StreamId;
pub use topology::*;
