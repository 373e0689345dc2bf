//! Replay 设备 - 从录制会话回放输出队列
//!
//! 读取录制工具产出的 manifest.json + frames.jsonl + 二进制帧文件，
//! 按原始时间戳把每条流回放进各自的输出队列。

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytes::Bytes;
use contracts::{
    FramePacket, ImuReport, PipelineTopology, PixelFormat, Quaternion, RawFrame, SharedFrameQueue,
    StreamId, TapPayload,
};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::device::DeviceRuntime;
use crate::error::{DeviceFactoryError, Result};
use crate::latest_queue::{latest_channel, LatestQueueSender};

/// Replay 配置
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// 录制会话根目录
    pub root: PathBuf,

    /// 回放速度倍率 (1.0 = 原速)
    pub speed_multiplier: f64,

    /// 是否循环回放
    pub loop_playback: bool,
}

impl ReplayConfig {
    /// 以原速、不循环的默认参数指向一个录制目录
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            speed_multiplier: 1.0,
            loop_playback: false,
        }
    }
}

/// 录制会话 manifest (manifest.json)
#[derive(Debug, Deserialize)]
pub struct RecordingManifest {
    pub version: String,
    pub created_at: String,
    pub device_name: String,
    pub duration_sec: f64,
    pub streams: HashMap<String, StreamMetadata>,
}

/// 单条流的元数据
#[derive(Debug, Deserialize)]
pub struct StreamMetadata {
    pub format: String,
    pub frame_count: u64,
}

/// frames.jsonl 中的一条帧记录
#[derive(Debug, Clone, Deserialize)]
struct FrameRecord {
    stream: String,
    timestamp: f64,
    sequence: u64,

    // 图像字段
    #[serde(default)]
    data_file: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    format: Option<PixelFormat>,

    // IMU 字段
    #[serde(default)]
    rotation: Option<[f64; 4]>,
    #[serde(default)]
    accuracy: Option<f64>,
}

/// Replay 设备
pub struct ReplayDevice {
    config: ReplayConfig,
    manifest: Option<RecordingManifest>,
    records: HashMap<String, Vec<FrameRecord>>,
    running: Arc<AtomicBool>,
    players: Mutex<Vec<JoinHandle<()>>>,
}

impl ReplayDevice {
    /// 创建指向一个录制目录的 replay 设备；实际加载发生在 boot
    pub fn new(config: ReplayConfig) -> Self {
        Self {
            config,
            manifest: None,
            records: HashMap::new(),
            running: Arc::new(AtomicBool::new(false)),
            players: Mutex::new(Vec::new()),
        }
    }

    /// 已加载的 manifest（boot 之前为 None）
    pub fn manifest(&self) -> Option<&RecordingManifest> {
        self.manifest.as_ref()
    }

    fn load_manifest(&self) -> Result<RecordingManifest> {
        let path = self.config.root.join("manifest.json");
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| DeviceFactoryError::recording_load(&path, e.to_string()))?;
        serde_json::from_str(&raw)
            .map_err(|e| DeviceFactoryError::recording_load(&path, e.to_string()))
    }

    fn load_records(&self) -> Result<HashMap<String, Vec<FrameRecord>>> {
        let path = self.config.root.join("frames.jsonl");
        let file =
            File::open(&path).map_err(|e| DeviceFactoryError::recording_load(&path, e.to_string()))?;
        let reader = BufReader::new(file);

        let mut records: HashMap<String, Vec<FrameRecord>> = HashMap::new();

        for line in reader.lines() {
            let line =
                line.map_err(|e| DeviceFactoryError::recording_load(&path, e.to_string()))?;
            if line.is_empty() {
                continue;
            }

            let record: FrameRecord = serde_json::from_str(&line)
                .map_err(|e| DeviceFactoryError::recording_load(&path, e.to_string()))?;
            records.entry(record.stream.clone()).or_default().push(record);
        }

        // 每条流按时间戳排序
        for stream_records in records.values_mut() {
            stream_records.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        }

        Ok(records)
    }

    fn spawn_player(&self, stream: StreamId, records: Vec<FrameRecord>, sender: LatestQueueSender) {
        let running = self.running.clone();
        let root = self.config.root.clone();
        let speed = self.config.speed_multiplier.max(0.1);
        let loop_playback = self.config.loop_playback;

        let handle = thread::spawn(move || {
            debug!(stream = %stream, records = records.len(), "replay thread started");

            loop {
                let start = Instant::now();
                let first_timestamp = records[0].timestamp;

                for record in &records {
                    if !running.load(Ordering::Relaxed) {
                        debug!(stream = %stream, "replay stopped");
                        return;
                    }

                    // 按原始时间轴调度
                    let offset = record.timestamp - first_timestamp;
                    let target = Duration::from_secs_f64(offset / speed);
                    let elapsed = start.elapsed();
                    if target > elapsed {
                        thread::sleep(target - elapsed);
                    }

                    if let Some(packet) = build_packet(&root, &stream, record) {
                        sender.push(packet);
                    }
                }

                if !loop_playback {
                    info!(stream = %stream, "replay completed");
                    break;
                }

                debug!(stream = %stream, "looping replay");
            }
        });

        self.players.lock().unwrap().push(handle);
    }
}

impl DeviceRuntime for ReplayDevice {
    fn backend(&self) -> &'static str {
        "replay"
    }

    #[instrument(
        name = "replay_device_boot",
        skip(self, topology),
        fields(root = %self.config.root.display(), taps = topology.taps().len())
    )]
    async fn boot(&mut self, topology: &PipelineTopology) -> Result<()> {
        let manifest = self.load_manifest()?;
        let records = self.load_records()?;

        for tap in topology.taps() {
            if !records.contains_key(tap.stream.as_str()) {
                warn!(stream = %tap.stream, "recording has no frames for requested stream");
            }
        }

        info!(
            streams = records.len(),
            duration_sec = manifest.duration_sec,
            device = %manifest.device_name,
            "recording loaded"
        );

        self.manifest = Some(manifest);
        self.records = records;
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    #[instrument(name = "replay_device_open_queue", skip(self), fields(stream = %stream))]
    async fn open_queue(&self, stream: &str) -> Result<SharedFrameQueue> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(DeviceFactoryError::queue_open(stream, "device not booted"));
        }

        let records = self
            .records
            .get(stream)
            .filter(|records| !records.is_empty())
            .cloned()
            .ok_or_else(|| {
                DeviceFactoryError::queue_open(stream, "recording has no frames for this stream")
            })?;

        let (sender, queue) = latest_channel(StreamId::new(stream));
        self.spawn_player(StreamId::new(stream), records, sender);
        Ok(Box::new(queue))
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    #[instrument(name = "replay_device_close", skip(self))]
    async fn close(&mut self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);

        let handles: Vec<_> = self.players.lock().unwrap().drain(..).collect();
        for handle in handles {
            let _ = handle.join();
        }

        self.manifest = None;
        self.records.clear();
        Ok(())
    }
}

/// 从记录构建 FramePacket；数据文件读不到时返回 None 并告警
fn build_packet(root: &Path, stream: &StreamId, record: &FrameRecord) -> Option<FramePacket> {
    let payload = if let Some(rotation) = record.rotation {
        TapPayload::Imu(ImuReport {
            timestamp: record.timestamp,
            rotation: Quaternion {
                i: rotation[0],
                j: rotation[1],
                k: rotation[2],
                real: rotation[3],
            },
            accuracy: record.accuracy,
        })
    } else {
        let data_file = record.data_file.as_ref()?;
        let path = root.join(data_file);
        let data = match std::fs::read(&path) {
            Ok(data) => Bytes::from(data),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read frame data file");
                return None;
            }
        };

        TapPayload::Image(RawFrame {
            width: record.width.unwrap_or(0),
            height: record.height.unwrap_or(0),
            format: record.format.unwrap_or(PixelFormat::Gray8),
            data,
        })
    };

    Some(FramePacket {
        stream: stream.clone(),
        timestamp: record.timestamp,
        sequence: Some(record.sequence),
        payload,
    })
}
