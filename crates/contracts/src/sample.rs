//! FrameSet / CapturedSample - Capture output
//!
//! One poll cycle's worth of frames, raw and assembled.

use ndarray::{Array3, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{RawFrame, RigError, StreamId};

/// Raw result of one "get one sample" cycle
///
/// Contains exactly one processed frame per fixed stream name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSet {
    /// Capture wall reference (seconds since session start)
    pub t_capture: f64,

    /// Poll cycle counter (monotonically increasing)
    pub cycle: u64,

    /// Stream name -> processed frame
    pub frames: HashMap<StreamId, RawFrame>,

    /// Capture metadata
    pub meta: CaptureMeta,
}

impl FrameSet {
    /// Frame for a stream name, as a frame-contract error when absent.
    pub fn frame(&self, stream: &str) -> Result<&RawFrame, RigError> {
        self.frames
            .get(stream)
            .ok_or_else(|| RigError::frame_layout(stream, "missing from frame set"))
    }
}

/// Capture metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptureMeta {
    /// Streams served from the stale-frame cache this cycle
    pub stale_streams: Vec<StreamId>,

    /// Device timestamps per stream (seconds)
    pub timestamps: HashMap<StreamId, f64>,

    /// Total poll duration for the cycle (microseconds)
    pub poll_micros: u64,
}

/// Assembled model input plus the auxiliary depth-family frames
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedSample {
    /// Capture wall reference (seconds since session start)
    pub t_capture: f64,

    /// Poll cycle counter
    pub cycle: u64,

    /// Channel-first (4, size, size) u8 tensor
    pub tensor: SampleTensor,

    /// Absolute depth frame (square, u16 millimeters), not stacked
    pub depth: RawFrame,

    /// Confidence frame (square, u8), not stacked
    pub confidence: RawFrame,

    /// Capture metadata
    pub meta: CaptureMeta,
}

/// Channel-first sample tensor
///
/// Shape is (4, size, size) u8: channels 0-2 color, channel 3 disparity.
/// The constructor enforces shape and standard layout, so views and byte
/// access never need to re-check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleTensor {
    data: Array3<u8>,
}

impl SampleTensor {
    /// Stacked channel count: color x3 + disparity
    pub const CHANNELS: usize = 4;

    /// Wrap an array, validating the (4, size, size) square shape.
    pub fn new(data: Array3<u8>) -> Result<Self, RigError> {
        let shape = data.shape();
        if shape[0] != Self::CHANNELS || shape[1] != shape[2] || shape[1] == 0 {
            return Err(RigError::frame_layout(
                "sample",
                format!(
                    "tensor shape ({}, {}, {}) is not (4, size, size)",
                    shape[0], shape[1], shape[2]
                ),
            ));
        }
        if !data.is_standard_layout() {
            return Err(RigError::frame_layout(
                "sample",
                "tensor must be in standard (row-major) layout",
            ));
        }
        Ok(Self { data })
    }

    /// Square edge length
    pub fn size(&self) -> u32 {
        self.data.shape()[1] as u32
    }

    /// Backing array
    pub fn data(&self) -> &Array3<u8> {
        &self.data
    }

    /// One channel plane
    pub fn channel(&self, c: usize) -> Option<ArrayView2<'_, u8>> {
        (c < Self::CHANNELS).then(|| self.data.index_axis(Axis(0), c))
    }

    /// Contiguous bytes in channel-major order
    pub fn as_bytes(&self) -> &[u8] {
        // new() enforced standard layout
        self.data.as_slice().unwrap_or(&[])
    }

    /// Consume into the backing array
    pub fn into_inner(self) -> Array3<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tensor_rejects_wrong_channel_count() {
        let arr = Array3::<u8>::zeros((3, 256, 256));
        assert!(SampleTensor::new(arr).is_err());
    }

    #[test]
    fn tensor_rejects_non_square() {
        let arr = Array3::<u8>::zeros((4, 256, 128));
        assert!(SampleTensor::new(arr).is_err());
    }

    #[test]
    fn tensor_accessors() {
        let arr = Array3::<u8>::from_elem((4, 8, 8), 7);
        let tensor = SampleTensor::new(arr).unwrap();
        assert_eq!(tensor.size(), 8);
        assert_eq!(tensor.as_bytes().len(), 4 * 8 * 8);
        assert_eq!(tensor.channel(3).unwrap()[[0, 0]], 7);
        assert!(tensor.channel(4).is_none());
    }

    #[test]
    fn frame_set_missing_stream_is_layout_error() {
        let set = FrameSet {
            t_capture: 0.0,
            cycle: 0,
            frames: HashMap::new(),
            meta: CaptureMeta::default(),
        };
        assert!(matches!(
            set.frame("rgb"),
            Err(RigError::FrameLayout { .. })
        ));
    }
}
