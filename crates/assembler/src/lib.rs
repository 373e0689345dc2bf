//! # Assembler
//!
//! 帧集合到模型输入张量的组装核心。
//!
//! 负责：
//! - 居中裁剪 + 双线性缩放 (宽横跨高的帧裁成正方形)
//! - 平面 (CHW) 与交错 (HWC) 像素布局互转
//! - 堆叠 (4, size, size) u8 张量：通道 0-2 彩色，通道 3 视差
//!
//! ## 使用示例
//!
//! ```ignore
//! use assembler::assemble;
//! use contracts::SamplerConfig;
//!
//! let config = SamplerConfig::default();
//! let sample = assemble(&frame_set, &config)?;
//! assert_eq!(sample.tensor.size(), config.output_size);
//! ```

mod assemble;
mod crop;
mod layout;

// Re-exports
pub use assemble::assemble;
pub use crop::{crop_left, crop_resize};
pub use layout::{interleaved_to_planar, planar_to_interleaved};

// Re-export contracts types
pub use contracts::{CapturedSample, FrameSet, SampleTensor, SamplerConfig};
