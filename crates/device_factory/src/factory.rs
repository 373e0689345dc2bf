//! DeviceFactory 核心实现
//!
//! 从 SamplerConfig 构建拓扑、启动设备并按固定顺序打开输出队列。

use contracts::{ImuSettings, SamplerConfig, SharedFrameQueue, StreamId, IMU_STREAM};
use tracing::{error, info, instrument, warn};

use crate::device::DeviceRuntime;
use crate::error::Result;
use crate::topology_builder::build_stereo_topology;

/// Device Factory
///
/// 负责把一份采样配置变成正在运行的 rig：构建拓扑、boot 设备、
/// 打开全部输出队列，并在失败时收拾残局。
pub struct DeviceFactory<D: DeviceRuntime> {
    device: D,
}

/// 已启动 rig 的队列集合
///
/// `taps` 与配置的流顺序一致，即下游的固定轮询顺序。
/// IMU 队列独立于采样循环之外。
pub struct RigTaps {
    pub taps: Vec<(StreamId, SharedFrameQueue)>,
    pub imu: Option<SharedFrameQueue>,
}

impl<D: DeviceRuntime> DeviceFactory<D> {
    /// 创建新的 DeviceFactory
    pub fn new(device: D) -> Self {
        Self { device }
    }

    /// 构建拓扑、boot 设备、按固定顺序打开全部输出队列
    ///
    /// # 原子性保证
    /// 任何一条队列打开失败都会关闭设备，不留下半启动状态。
    #[instrument(
        name = "device_factory_boot_rig",
        skip(self, config, imu),
        fields(preview_resolution = config.preview_resolution, imu_enabled = imu.enabled)
    )]
    pub async fn boot_rig(&mut self, config: &SamplerConfig, imu: &ImuSettings) -> Result<RigTaps> {
        let topology = build_stereo_topology(config, imu)?;

        info!(
            nodes = topology.nodes().len(),
            taps = topology.taps().len(),
            backend = self.device.backend(),
            "booting device"
        );
        self.device.boot(&topology).await?;

        let mut taps: Vec<(StreamId, SharedFrameQueue)> = Vec::with_capacity(config.streams.len());

        for stream in &config.streams {
            match self.device.open_queue(stream.as_str()).await {
                Ok(queue) => {
                    info!(stream = %stream, "output queue opened");
                    taps.push((stream.clone(), queue));
                }
                Err(e) => {
                    warn!(
                        stream = %stream,
                        error = %e,
                        "queue open failed, shutting down device"
                    );
                    self.close_device_safe().await;
                    return Err(e);
                }
            }
        }

        let imu_tap = if imu.enabled {
            match self.device.open_queue(IMU_STREAM).await {
                Ok(queue) => {
                    info!(stream = IMU_STREAM, "side queue opened");
                    Some(queue)
                }
                Err(e) => {
                    warn!(
                        stream = IMU_STREAM,
                        error = %e,
                        "queue open failed, shutting down device"
                    );
                    self.close_device_safe().await;
                    return Err(e);
                }
            }
        } else {
            None
        };

        info!(taps = taps.len(), "rig booted");
        Ok(RigTaps { taps, imu: imu_tap })
    }

    /// 关闭设备
    ///
    /// # 幂等性
    /// 多次调用安全。
    #[instrument(name = "device_factory_shutdown", skip(self))]
    pub async fn shutdown(&mut self) -> Result<()> {
        info!("shutting down device");
        self.device.close().await?;
        info!("shutdown completed");
        Ok(())
    }

    /// 安全关闭设备（忽略错误，仅记录日志）
    async fn close_device_safe(&mut self) {
        if let Err(e) = self.device.close().await {
            error!(error = %e, "failed to close device");
        }
    }

    /// 底层设备的引用（诊断与测试用）
    pub fn device(&self) -> &D {
        &self.device
    }
}
