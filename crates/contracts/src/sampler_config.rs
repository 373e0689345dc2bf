//! Sampler configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};

use crate::{MonoResolution, StreamId};

/// Color preview stream name
pub const RGB_STREAM: &str = "rgb";
/// Disparity stream name (stacked as tensor channel 3)
pub const DISPARITY_STREAM: &str = "depth_fac";
/// Absolute depth stream name (u16 millimeters, diagnostic)
pub const DEPTH_STREAM: &str = "depth_dist";
/// Confidence stream name (diagnostic)
pub const CONFIDENCE_STREAM: &str = "depth_conf";
/// Optional IMU side stream name, outside the sample cycle
pub const IMU_STREAM: &str = "imu";

/// The four sample streams in their fixed poll order
pub const SAMPLE_STREAMS: [&str; 4] = [
    RGB_STREAM,
    DISPARITY_STREAM,
    DEPTH_STREAM,
    CONFIDENCE_STREAM,
];

/// Sampler configuration
///
/// Gathers the constants the capture path depends on into one immutable
/// structure passed at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Square color preview edge length (pixels)
    pub preview_resolution: u32,

    /// Square output edge length for crop-resize and the sample tensor
    #[serde(default = "default_output_size")]
    pub output_size: u32,

    /// Mono camera resolution tier feeding the stereo matcher
    #[serde(default)]
    pub mono_resolution: MonoResolution,

    /// Stereo matcher flags
    #[serde(default)]
    pub stereo: StereoFlags,

    /// Behavior when a polled queue holds no new frame
    #[serde(default)]
    pub empty_policy: EmptyPolicy,

    /// Sample stream names in poll order
    #[serde(default = "default_streams")]
    pub streams: [StreamId; 4],
}

fn default_output_size() -> u32 {
    256
}

fn default_streams() -> [StreamId; 4] {
    SAMPLE_STREAMS.map(StreamId::new)
}

impl SamplerConfig {
    /// Config with defaults for everything except the preview resolution
    pub fn with_resolution(preview_resolution: u32) -> Self {
        Self {
            preview_resolution,
            output_size: default_output_size(),
            mono_resolution: MonoResolution::default(),
            stereo: StereoFlags::default(),
            empty_policy: EmptyPolicy::default(),
            streams: default_streams(),
        }
    }
}

/// Stereo matcher flags
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StereoFlags {
    /// Left-right consistency check
    pub lr_check: bool,
    /// Extended disparity range
    pub extended_disparity: bool,
    /// Sub-pixel disparity precision
    pub subpixel: bool,
}

impl Default for StereoFlags {
    fn default() -> Self {
        Self {
            lr_check: true,
            extended_disparity: false,
            subpixel: false,
        }
    }
}

/// Behavior of "get one sample" when a queue has no new frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyPolicy {
    /// Wait for the producer's next frame
    #[default]
    Block,
    /// Serve the last frame seen on that stream; error if none ever arrived
    Stale,
    /// Surface an explicit no-data error and let the caller retry
    Fail,
}
