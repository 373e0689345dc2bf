//! # Dispatcher
//!
//! 样本分发模块。
//!
//! 负责：
//! - 消费 `CapturedSample`
//! - Fan-out 到多个 sinks
//! - 隔离慢 sink，不阻塞采样链路

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use contracts::{CapturedSample, SampleSink, SinkKind, SinkSpec};
pub use dispatcher::{Dispatcher, DispatcherBuilder, DispatcherConfig, create_dispatcher};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{FileSink, LogSink, UdpSink};

#[cfg(test)]
pub(crate) mod testing {
    use bytes::Bytes;
    use contracts::{CaptureMeta, CapturedSample, PixelFormat, RawFrame, SampleTensor};
    use ndarray::Array3;

    /// 构造一个 4x4 的最小样本，各 sink 测试共用。
    pub fn sample(cycle: u64) -> CapturedSample {
        let side = 4usize;
        let tensor = Array3::from_shape_fn((SampleTensor::CHANNELS, side, side), |(c, y, x)| {
            (c * 50 + y * side + x) as u8
        });
        let depth_data: Vec<u8> = (0..side * side)
            .flat_map(|_| 1000u16.to_ne_bytes())
            .collect();

        CapturedSample {
            t_capture: cycle as f64,
            cycle,
            tensor: SampleTensor::new(tensor).expect("fixture tensor"),
            depth: RawFrame {
                width: side as u32,
                height: side as u32,
                format: PixelFormat::Gray16,
                data: Bytes::from(depth_data),
            },
            confidence: RawFrame {
                width: side as u32,
                height: side as u32,
                format: PixelFormat::Gray8,
                data: Bytes::from(vec![200u8; side * side]),
            },
            meta: CaptureMeta::default(),
        }
    }
}
