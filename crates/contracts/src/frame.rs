//! FramePacket - 设备队列输出
//!
//! 从输出队列取出的原始帧数据结构。

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{RigError, StreamId};

/// 帧数据包
///
/// 设备运行时通过输出队列交付的一条数据。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FramePacket {
    /// 所属输出流
    pub stream: StreamId,

    /// 设备时间戳 (seconds, f64) - 主时钟
    pub timestamp: f64,

    /// 可选的帧序号 (用于排序/诊断)
    pub sequence: Option<u64>,

    /// 数据载荷 (零拷贝)
    pub payload: TapPayload,
}

impl FramePacket {
    /// 取出图像载荷；载荷类型不符时报前置条件错误。
    pub fn into_image(self) -> Result<RawFrame, RigError> {
        match self.payload {
            TapPayload::Image(frame) => Ok(frame),
            other => Err(RigError::frame_layout(
                self.stream.as_str(),
                format!("expected image payload, got {}", other.kind()),
            )),
        }
    }
}

/// 队列载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TapPayload {
    /// 图像帧 (彩色/视差/深度/置信度)
    Image(RawFrame),

    /// IMU 旋转向量报告
    Imu(ImuReport),

    /// 原始字节 (fallback)
    Raw(Bytes),
}

impl TapPayload {
    /// 载荷类别名 (用于日志/错误信息)
    pub fn kind(&self) -> &'static str {
        match self {
            TapPayload::Image(_) => "image",
            TapPayload::Imu(_) => "imu",
            TapPayload::Raw(_) => "raw",
        }
    }
}

/// 原始帧
///
/// 2-D 像素缓冲；彩色流为平面 (planar) 三通道，深度族为单通道。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFrame {
    /// 图像宽度
    pub width: u32,

    /// 图像高度
    pub height: u32,

    /// 像素格式
    pub format: PixelFormat,

    /// 原始像素数据
    pub data: Bytes,
}

impl RawFrame {
    /// 按宽高与格式推算的缓冲区字节数
    pub fn expected_len(&self) -> usize {
        self.width as usize
            * self.height as usize
            * self.format.channels()
            * self.format.bytes_per_channel()
    }

    /// 校验缓冲区长度与声明的几何一致
    pub fn validate(&self, stream: &StreamId) -> Result<(), RigError> {
        if self.data.len() != self.expected_len() {
            return Err(RigError::frame_layout(
                stream.as_str(),
                format!(
                    "buffer is {} bytes, {}x{} {:?} needs {}",
                    self.data.len(),
                    self.width,
                    self.height,
                    self.format,
                    self.expected_len()
                ),
            ));
        }
        Ok(())
    }
}

/// 像素格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// 单通道 8 位 (视差/置信度)
    Gray8,

    /// 单通道 16 位小端 (绝对深度, 毫米)
    Gray16,

    /// 三通道 8 位交错 (HWC)
    Rgb8,

    /// 三通道 8 位平面 (CHW, 预览输出的 non-interleaved 布局)
    Rgb8Planar,
}

impl PixelFormat {
    /// 通道数
    pub fn channels(&self) -> usize {
        match self {
            PixelFormat::Gray8 | PixelFormat::Gray16 => 1,
            PixelFormat::Rgb8 | PixelFormat::Rgb8Planar => 3,
        }
    }

    /// 每通道字节数
    pub fn bytes_per_channel(&self) -> usize {
        match self {
            PixelFormat::Gray16 => 2,
            _ => 1,
        }
    }
}

/// IMU 旋转向量报告
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ImuReport {
    /// 设备时间戳 (秒)
    pub timestamp: f64,

    /// 姿态四元数
    pub rotation: Quaternion,

    /// 精度估计 (弧度), 设备未提供时为 None
    pub accuracy: Option<f64>,
}

/// 四元数 (i, j, k, real)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Quaternion {
    pub i: f64,
    pub j: f64,
    pub k: f64,
    pub real: f64,
}
