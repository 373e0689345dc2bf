//! RigBlueprint - Config Loader 输出
//!
//! 描述完整的采集配置：相机、立体匹配、采样策略、IMU、输出路由。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{EmptyPolicy, SamplerConfig, StereoFlags};

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的采集配置蓝图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 相机设置
    pub rig: RigSettings,

    /// 立体匹配设置
    #[serde(default)]
    pub stereo: StereoSettings,

    /// 采样设置
    #[serde(default)]
    pub capture: CaptureSettings,

    /// IMU 旁路流设置
    #[serde(default)]
    pub imu: ImuSettings,

    /// 输出路由配置
    #[serde(default)]
    pub sinks: Vec<SinkSpec>,
}

/// 相机设置：预览分辨率、单目档位等
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigSettings {
    /// 设备名称 (用于日志/输出目录)
    #[serde(default = "default_rig_name")]
    pub name: String,

    /// 彩色预览边长 (像素, 正方形)
    pub preview_resolution: u32,

    /// 裁剪缩放后的输出边长
    #[serde(default = "default_output_size")]
    pub output_size: u32,

    /// 单目相机分辨率档位
    #[serde(default)]
    pub mono_resolution: MonoResolution,

    /// 相机帧率 (Hz)
    #[serde(default = "default_fps")]
    pub fps: f64,
}

fn default_rig_name() -> String {
    "stereo_rig".to_string()
}

fn default_output_size() -> u32 {
    256
}

fn default_fps() -> f64 {
    30.0
}

/// 单目相机分辨率档位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonoResolution {
    /// 640x400
    #[default]
    The400P,
    /// 640x480
    The480P,
    /// 1280x720
    The720P,
    /// 1280x800
    The800P,
}

impl MonoResolution {
    /// 档位对应的 (宽, 高)
    pub fn dims(&self) -> (u32, u32) {
        match self {
            MonoResolution::The400P => (640, 400),
            MonoResolution::The480P => (640, 480),
            MonoResolution::The720P => (1280, 720),
            MonoResolution::The800P => (1280, 800),
        }
    }
}

/// 立体匹配设置
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StereoSettings {
    /// 左右一致性检查
    #[serde(default = "default_true")]
    pub lr_check: bool,

    /// 扩展视差范围
    #[serde(default)]
    pub extended_disparity: bool,

    /// 亚像素精度
    #[serde(default)]
    pub subpixel: bool,
}

fn default_true() -> bool {
    true
}

impl Default for StereoSettings {
    fn default() -> Self {
        Self {
            lr_check: true,
            extended_disparity: false,
            subpixel: false,
        }
    }
}

impl From<StereoSettings> for StereoFlags {
    fn from(settings: StereoSettings) -> Self {
        Self {
            lr_check: settings.lr_check,
            extended_disparity: settings.extended_disparity,
            subpixel: settings.subpixel,
        }
    }
}

/// 采样设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// 队列无新帧时的策略
    #[serde(default)]
    pub empty_policy: EmptyPolicy,

    /// 采样频率 (Hz)，0 表示不限速
    #[serde(default = "default_cadence")]
    pub cadence_hz: f64,

    /// 采样结果通道容量
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// 背压满时的丢弃策略
    #[serde(default)]
    pub drop_policy: DropPolicy,
}

fn default_cadence() -> f64 {
    30.0
}

fn default_channel_capacity() -> usize {
    64
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            empty_policy: EmptyPolicy::default(),
            cadence_hz: default_cadence(),
            channel_capacity: default_channel_capacity(),
            drop_policy: DropPolicy::default(),
        }
    }
}

/// 丢包策略 (背压满时)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropPolicy {
    /// 丢弃最旧的样本
    #[default]
    DropOldest,
    /// 丢弃最新的样本
    DropNewest,
}

/// IMU 旁路流设置
///
/// 不参与四流采样循环；启用后设备额外暴露 "imu" 队列。
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ImuSettings {
    /// 是否启用
    #[serde(default)]
    pub enabled: bool,

    /// 旋转向量上报频率 (Hz)
    #[serde(default = "default_imu_rate")]
    pub rate_hz: u32,

    /// 批量上报阈值
    #[serde(default = "default_imu_batch")]
    pub batch_report_threshold: u32,

    /// 单次最大批量
    #[serde(default = "default_imu_batch")]
    pub max_batch_reports: u32,
}

fn default_imu_rate() -> u32 {
    10
}

fn default_imu_batch() -> u32 {
    1
}

impl Default for ImuSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            rate_hz: default_imu_rate(),
            batch_report_threshold: default_imu_batch(),
            max_batch_reports: default_imu_batch(),
        }
    }
}

/// Sink 输出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkSpec {
    /// Sink 名称
    pub name: String,

    /// Sink 类型
    pub kind: SinkKind,

    /// 队列容量
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// 日志输出
    Log,
    /// 文件输出
    File,
    /// 网络输出 (UDP)
    Udp,
}

impl RigBlueprint {
    /// Build the immutable runtime config from blueprint data
    pub fn to_sampler_config(&self) -> SamplerConfig {
        let mut config = SamplerConfig::with_resolution(self.rig.preview_resolution);
        config.output_size = self.rig.output_size;
        config.mono_resolution = self.rig.mono_resolution;
        config.stereo = self.stereo.into();
        config.empty_policy = self.capture.empty_policy;
        config
    }
}
