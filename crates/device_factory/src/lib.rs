//! # Device Factory
//!
//! Stereo rig device module.
//!
//! Responsibilities:
//! - Build the stereo pipeline topology from `SamplerConfig`
//! - Boot a device runtime and open its output queues in fixed order
//! - Provide unified `DeviceRuntime` abstraction
//! - Support Mock and Replay backends

pub mod device;
pub mod error;
pub mod factory;
pub mod latest_queue;
pub mod mock_device;
pub mod replay_device;
pub mod topology_builder;

pub use contracts::{PipelineTopology, SharedFrameQueue};
pub use device::DeviceRuntime;
pub use error::{DeviceFactoryError, Result};
pub use factory::{DeviceFactory, RigTaps};
pub use latest_queue::{latest_channel, LatestFrameQueue, LatestQueueSender};
pub use mock_device::{MockDevice, MockDeviceConfig};
pub use replay_device::{RecordingManifest, ReplayConfig, ReplayDevice};
pub use topology_builder::build_stereo_topology;
