//! Mock 设备运行时
//!
//! 不依赖真实硬件的 `DeviceRuntime` 实现。每条已打开的输出流由一个
//! 后台线程按帧率生成确定性的合成帧，支持注入失败场景。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytes::Bytes;
use contracts::topology::{ports, NodeId, NodeKind};
use contracts::{
    FramePacket, ImuReport, PipelineTopology, PixelFormat, Quaternion, RawFrame, SharedFrameQueue,
    StreamId, TapPayload,
};
use tracing::{debug, instrument, trace};

use crate::device::DeviceRuntime;
use crate::error::{DeviceFactoryError, Result};
use crate::latest_queue::{latest_channel, LatestQueueSender};

/// Mock 设备配置
#[derive(Debug, Clone)]
pub struct MockDeviceConfig {
    /// 图像流帧率 (Hz)
    pub fps: f64,
    /// 每条队列最多产出的帧数 (None = 不限)
    pub frame_limit: Option<u64>,
    /// boot 应该失败
    pub fail_boot: bool,
    /// open_queue 应该失败的流名
    pub fail_queues: Vec<String>,
}

impl Default for MockDeviceConfig {
    fn default() -> Self {
        Self {
            fps: 30.0,
            frame_limit: None,
            fail_boot: false,
            fail_queues: Vec::new(),
        }
    }
}

/// Mock 设备
pub struct MockDevice {
    /// 配置（可注入失败场景）
    config: MockDeviceConfig,
    /// boot 时拿到的拓扑
    topology: Mutex<Option<PipelineTopology>>,
    /// 设备时钟起点，所有流的时间戳共用
    epoch: Mutex<Instant>,
    /// 运行状态
    running: Arc<AtomicBool>,
    /// 生产者线程句柄
    producers: Mutex<Vec<JoinHandle<()>>>,
}

impl MockDevice {
    /// 创建默认 mock 设备
    pub fn new() -> Self {
        Self::with_config(MockDeviceConfig::default())
    }

    /// 使用配置创建 mock 设备
    pub fn with_config(config: MockDeviceConfig) -> Self {
        Self {
            config,
            topology: Mutex::new(None),
            epoch: Mutex::new(Instant::now()),
            running: Arc::new(AtomicBool::new(false)),
            producers: Mutex::new(Vec::new()),
        }
    }

    /// 当前生产者线程数
    pub fn producer_count(&self) -> usize {
        self.producers.lock().unwrap().len()
    }

    fn spawn_producer(&self, stream: StreamId, profile: TapProfile, sender: LatestQueueSender) {
        let running = self.running.clone();
        let frame_limit = self.config.frame_limit;
        let fps = match profile {
            TapProfile::Rotation { rate_hz } => f64::from(rate_hz),
            _ => self.config.fps,
        };
        let interval = Duration::from_secs_f64(1.0 / fps.max(0.1));
        let epoch = *self.epoch.lock().unwrap();

        let handle = thread::spawn(move || {
            let mut sequence: u64 = 0;

            debug!(stream = %stream, ?profile, fps, "mock producer started");

            while running.load(Ordering::Relaxed) {
                sequence += 1;
                let timestamp = epoch.elapsed().as_secs_f64();
                let payload = generate_payload(profile, sequence, timestamp);

                sender.push(FramePacket {
                    stream: stream.clone(),
                    timestamp,
                    sequence: Some(sequence),
                    payload,
                });

                trace!(stream = %stream, sequence, timestamp, "mock frame buffered");

                if frame_limit.is_some_and(|limit| sequence >= limit) {
                    break;
                }

                thread::sleep(interval);
            }

            debug!(stream = %stream, sequence, "mock producer stopped");
        });

        self.producers.lock().unwrap().push(handle);
    }
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRuntime for MockDevice {
    fn backend(&self) -> &'static str {
        "mock"
    }

    #[instrument(
        name = "mock_device_boot",
        skip(self, topology),
        fields(nodes = topology.nodes().len(), taps = topology.taps().len())
    )]
    async fn boot(&mut self, topology: &PipelineTopology) -> Result<()> {
        if self.config.fail_boot {
            return Err(DeviceFactoryError::boot_failed("mock failure"));
        }
        if topology.taps().is_empty() {
            return Err(DeviceFactoryError::TopologyRejected {
                node: "xout".into(),
                message: "topology exposes no output stream".into(),
            });
        }

        *self.topology.lock().unwrap() = Some(topology.clone());
        *self.epoch.lock().unwrap() = Instant::now();
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    #[instrument(name = "mock_device_open_queue", skip(self), fields(stream = %stream))]
    async fn open_queue(&self, stream: &str) -> Result<SharedFrameQueue> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(DeviceFactoryError::queue_open(stream, "device not booted"));
        }
        if self.config.fail_queues.iter().any(|name| name == stream) {
            return Err(DeviceFactoryError::queue_open(stream, "mock failure"));
        }

        let profile = {
            let topology = self.topology.lock().unwrap();
            let topology = topology
                .as_ref()
                .ok_or_else(|| DeviceFactoryError::queue_open(stream, "device not booted"))?;
            resolve_profile(topology, stream)?
        };

        let (sender, queue) = latest_channel(StreamId::new(stream));
        self.spawn_producer(StreamId::new(stream), profile, sender);
        Ok(Box::new(queue))
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    #[instrument(name = "mock_device_close", skip(self))]
    async fn close(&mut self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);

        let handles: Vec<_> = self.producers.lock().unwrap().drain(..).collect();
        for handle in handles {
            let _ = handle.join();
        }

        *self.topology.lock().unwrap() = None;
        Ok(())
    }
}

/// 队列的合成数据形态，由拓扑中馈给该 tap 的节点决定
#[derive(Debug, Clone, Copy)]
enum TapProfile {
    ColorPreview { width: u32, height: u32 },
    Disparity { width: u32, height: u32 },
    Depth { width: u32, height: u32 },
    Confidence { width: u32, height: u32 },
    Rotation { rate_hz: u32 },
}

/// 解析流名对应的 tap 馈源，得出合成帧的几何与格式
fn resolve_profile(topology: &PipelineTopology, stream: &str) -> Result<TapProfile> {
    let tap = topology
        .taps()
        .iter()
        .find(|tap| tap.stream == stream)
        .ok_or_else(|| DeviceFactoryError::queue_open(stream, "topology exposes no such stream"))?;
    let link = topology
        .links()
        .iter()
        .find(|link| link.to == tap.node)
        .ok_or_else(|| DeviceFactoryError::queue_open(stream, "tap node has no input link"))?;
    let source = topology
        .node(link.from)
        .ok_or_else(|| DeviceFactoryError::queue_open(stream, "tap source node missing"))?;

    match (&source.kind, link.from_port.as_str()) {
        (NodeKind::ColorCamera(cam), ports::PREVIEW) => Ok(TapProfile::ColorPreview {
            width: cam.preview_width,
            height: cam.preview_height,
        }),
        (NodeKind::StereoDepth(_), port) => {
            let (width, height) = stereo_input_dims(topology, source.id).ok_or_else(|| {
                DeviceFactoryError::queue_open(stream, "stereo node has no mono camera input")
            })?;
            match port {
                ports::DISPARITY => Ok(TapProfile::Disparity { width, height }),
                ports::DEPTH => Ok(TapProfile::Depth { width, height }),
                ports::CONFIDENCE => Ok(TapProfile::Confidence { width, height }),
                other => Err(DeviceFactoryError::queue_open(
                    stream,
                    format!("unsupported stereo port '{other}'"),
                )),
            }
        }
        (NodeKind::Imu(imu), ports::OUT) => Ok(TapProfile::Rotation {
            rate_hz: imu.rate_hz,
        }),
        (kind, port) => Err(DeviceFactoryError::queue_open(
            stream,
            format!("unsupported tap source {}:{}", kind.name(), port),
        )),
    }
}

/// 深度族帧继承 mono 相机的几何
fn stereo_input_dims(topology: &PipelineTopology, stereo: NodeId) -> Option<(u32, u32)> {
    topology
        .links()
        .iter()
        .filter(|link| link.to == stereo)
        .find_map(|link| match &topology.node(link.from)?.kind {
            NodeKind::MonoCamera(mono) => Some((mono.width, mono.height)),
            _ => None,
        })
}

/// 生成确定性合成载荷
fn generate_payload(profile: TapProfile, sequence: u64, timestamp: f64) -> TapPayload {
    match profile {
        TapProfile::ColorPreview { width, height } => {
            // 平面布局：三个通道各自整面填充，便于下游校验通道顺序
            let plane = (width * height) as usize;
            let base = (sequence % 160) as u8;
            let data = [
                vec![base; plane],
                vec![base + 40; plane],
                vec![base + 80; plane],
            ]
            .concat();
            TapPayload::Image(RawFrame {
                width,
                height,
                format: PixelFormat::Rgb8Planar,
                data: Bytes::from(data),
            })
        }
        TapProfile::Disparity { width, height } => {
            // 标准模式视差范围 0..=95
            let value = (sequence % 96) as u8;
            TapPayload::Image(RawFrame {
                width,
                height,
                format: PixelFormat::Gray8,
                data: Bytes::from(vec![value; (width * height) as usize]),
            })
        }
        TapProfile::Depth { width, height } => {
            let mm: u16 = 600 + (sequence % 64) as u16 * 25;
            let mut data = Vec::with_capacity((width * height) as usize * 2);
            for _ in 0..width * height {
                data.extend_from_slice(&mm.to_le_bytes());
            }
            TapPayload::Image(RawFrame {
                width,
                height,
                format: PixelFormat::Gray16,
                data: Bytes::from(data),
            })
        }
        TapProfile::Confidence { width, height } => {
            let value = sequence as u8;
            TapPayload::Image(RawFrame {
                width,
                height,
                format: PixelFormat::Gray8,
                data: Bytes::from(vec![value; (width * height) as usize]),
            })
        }
        TapProfile::Rotation { .. } => {
            let half = timestamp * 0.125;
            TapPayload::Imu(ImuReport {
                timestamp,
                rotation: Quaternion {
                    i: 0.0,
                    j: 0.0,
                    k: half.sin(),
                    real: half.cos(),
                },
                accuracy: Some(0.01),
            })
        }
    }
}
