//! 采集工作线程：轮询、组装、转发。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use async_channel::{Receiver, Sender, TrySendError};
use contracts::{CaptureSettings, CapturedSample, ErrorClass, RigError, SamplerConfig};
use tracing::{debug, error, info, trace, warn};

use crate::config::{BackpressureConfig, CaptureMetrics, DropPolicy};
use crate::sample_reader::SampleReader;

/// 工作线程配置
#[derive(Debug, Clone)]
pub struct CaptureWorkerConfig {
    /// 目标采样频率 (Hz)，0 表示不限速
    pub cadence_hz: f64,

    /// 背压配置
    pub backpressure: BackpressureConfig,
}

impl Default for CaptureWorkerConfig {
    fn default() -> Self {
        Self {
            cadence_hz: 30.0,
            backpressure: BackpressureConfig::default(),
        }
    }
}

impl From<&CaptureSettings> for CaptureWorkerConfig {
    fn from(settings: &CaptureSettings) -> Self {
        Self {
            cadence_hz: settings.cadence_hz,
            backpressure: BackpressureConfig::new(settings.channel_capacity, settings.drop_policy),
        }
    }
}

/// 采集工作线程
///
/// 独占一个系统线程跑阻塞轮询循环，产出的样本经有界通道交给
/// 异步侧消费。上游队列关闭后线程自行退出。
pub struct CaptureWorker {
    metrics: Arc<CaptureMetrics>,
    receiver: Option<Receiver<CapturedSample>>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CaptureWorker {
    /// 启动工作线程。
    pub fn spawn(
        reader: SampleReader,
        sampler: SamplerConfig,
        config: CaptureWorkerConfig,
    ) -> Self {
        let (tx, rx) = async_channel::bounded(config.backpressure.channel_capacity.max(1));
        let metrics = Arc::new(CaptureMetrics::new());
        let running = Arc::new(AtomicBool::new(true));

        let worker_metrics = Arc::clone(&metrics);
        let worker_running = Arc::clone(&running);
        let reclaim = rx.clone();
        let handle = thread::spawn(move || {
            run_loop(
                reader,
                sampler,
                config,
                tx,
                reclaim,
                worker_metrics,
                worker_running,
            );
        });

        Self {
            metrics,
            receiver: Some(rx),
            running,
            handle: Some(handle),
        }
    }

    /// 样本接收端，只能取走一次。
    pub fn take_receiver(&mut self) -> Option<Receiver<CapturedSample>> {
        self.receiver.take()
    }

    /// 采集指标。
    pub fn metrics(&self) -> Arc<CaptureMetrics> {
        Arc::clone(&self.metrics)
    }

    /// 请求停止。阻塞中的轮询要等下一帧或队列关闭才会察觉。
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// 等待线程退出。
    ///
    /// 线程在上游队列关闭后自行退出；主动停机走 [`Self::shutdown`]。
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// 请求停止并等待线程退出。
    ///
    /// `Block` 策略下轮询可能阻塞在 `recv` 上，正常停机顺序是
    /// 先关设备 (关闭全部队列) 再调用本方法。
    pub fn shutdown(&mut self) {
        self.request_stop();
        self.join();
    }
}

impl Drop for CaptureWorker {
    fn drop(&mut self) {
        self.request_stop();
    }
}

fn run_loop(
    mut reader: SampleReader,
    sampler: SamplerConfig,
    config: CaptureWorkerConfig,
    tx: Sender<CapturedSample>,
    reclaim: Receiver<CapturedSample>,
    metrics: Arc<CaptureMetrics>,
    running: Arc<AtomicBool>,
) {
    let period = (config.cadence_hz > 0.0).then(|| Duration::from_secs_f64(1.0 / config.cadence_hz));
    debug!(cadence_hz = config.cadence_hz, "capture worker started");

    while running.load(Ordering::SeqCst) {
        let cycle_start = Instant::now();

        if !capture_cycle(
            &mut reader,
            &sampler,
            config.backpressure.drop_policy,
            &tx,
            &reclaim,
            &metrics,
        ) {
            break;
        }

        if let Some(period) = period {
            let elapsed = cycle_start.elapsed();
            if elapsed < period {
                thread::sleep(period - elapsed);
            }
        }
    }

    info!("capture worker stopped");
}

/// 执行一轮采集。返回 `false` 表示工作线程应当退出。
fn capture_cycle(
    reader: &mut SampleReader,
    sampler: &SamplerConfig,
    drop_policy: DropPolicy,
    tx: &Sender<CapturedSample>,
    reclaim: &Receiver<CapturedSample>,
    metrics: &Arc<CaptureMetrics>,
) -> bool {
    let set = match reader.get_sample() {
        Ok(set) => set,
        Err(RigError::QueueClosed { stream }) => {
            info!(stream = %stream, "queue closed, stopping capture");
            return false;
        }
        Err(RigError::NoData { stream }) => {
            metrics.record_empty_poll();
            metrics::counter!("capture_empty_polls_total").increment(1);
            trace!(stream = %stream, "no new frame this cycle");
            return true;
        }
        Err(err) if err.class() == ErrorClass::Precondition => {
            metrics.record_assembly_error();
            metrics::counter!("capture_samples_total", "status" => "error").increment(1);
            error!(error = %err, "frame violates the stream contract");
            return true;
        }
        Err(err) => {
            warn!(error = %err, "sample poll failed");
            return true;
        }
    };

    if !set.meta.stale_streams.is_empty() {
        metrics::counter!("capture_stale_serves_total")
            .increment(set.meta.stale_streams.len() as u64);
    }

    match assembler::assemble(&set, sampler) {
        Ok(sample) => {
            metrics.record_captured();
            metrics::counter!("capture_samples_total", "status" => "ok").increment(1);
            metrics::histogram!("capture_poll_micros").record(set.meta.poll_micros as f64);
            forward_sample(tx, reclaim, sample, metrics, drop_policy);
            metrics.update_queue_len(tx.len());
        }
        Err(err) => {
            metrics.record_assembly_error();
            metrics::counter!("capture_samples_total", "status" => "error").increment(1);
            error!(error = %err, cycle = set.cycle, "sample assembly failed");
        }
    }

    true
}

/// 按背压策略转发样本。
///
/// `DropOldest` 用保留的接收端克隆弹出最旧样本腾出空位，让下游
/// 总是拿到较新的数据。
fn forward_sample(
    tx: &Sender<CapturedSample>,
    reclaim: &Receiver<CapturedSample>,
    sample: CapturedSample,
    metrics: &Arc<CaptureMetrics>,
    drop_policy: DropPolicy,
) {
    let cycle = sample.cycle;
    match tx.try_send(sample) {
        Ok(_) => {
            trace!(cycle, "sample forwarded");
        }
        Err(TrySendError::Full(sample)) => match drop_policy {
            DropPolicy::DropNewest => {
                metrics.record_dropped();
                metrics::counter!("capture_samples_dropped_total").increment(1);
                trace!(cycle, "sample dropped (newest)");
            }
            DropPolicy::DropOldest => {
                if reclaim.try_recv().is_ok() {
                    metrics.record_dropped();
                    metrics::counter!("capture_samples_dropped_total").increment(1);
                    trace!(cycle, "oldest sample dropped");
                }
                if tx.try_send(sample).is_err() {
                    metrics.record_dropped();
                    metrics::counter!("capture_samples_dropped_total").increment(1);
                    trace!(cycle, "sample dropped (channel still full)");
                }
            }
        },
        Err(TrySendError::Closed(_)) => {
            warn!(cycle, "sample channel closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample_reader::testing::ScriptedQueue;
    use bytes::Bytes;
    use contracts::{
        EmptyPolicy, FramePacket, PixelFormat, RawFrame, SAMPLE_STREAMS, SharedFrameQueue,
        StreamId, TapPayload,
    };

    fn image_packet(stream: &str, timestamp: f64, frame: RawFrame) -> FramePacket {
        FramePacket {
            stream: stream.into(),
            timestamp,
            sequence: None,
            payload: TapPayload::Image(frame),
        }
    }

    fn color_frame(value: u8) -> RawFrame {
        RawFrame {
            width: 8,
            height: 8,
            format: PixelFormat::Rgb8Planar,
            data: Bytes::from(vec![value; 3 * 64]),
        }
    }

    fn depth_family_frame(format: PixelFormat, value: u8) -> RawFrame {
        let len = 12 * 8 * format.bytes_per_channel();
        RawFrame {
            width: 12,
            height: 8,
            format,
            data: Bytes::from(vec![value; len]),
        }
    }

    fn stream_frame(name: &str, n: usize) -> RawFrame {
        match name {
            "rgb" => color_frame(n as u8),
            "depth_dist" => depth_family_frame(PixelFormat::Gray16, n as u8),
            _ => depth_family_frame(PixelFormat::Gray8, n as u8),
        }
    }

    fn scripted_rig(cycles: usize) -> (SampleReader, SamplerConfig) {
        let taps: Vec<(StreamId, SharedFrameQueue)> = SAMPLE_STREAMS
            .iter()
            .map(|name| {
                let frames = (0..cycles)
                    .map(|n| image_packet(name, n as f64 * 0.1, stream_frame(name, n)))
                    .collect();
                (StreamId::new(name), ScriptedQueue::boxed(name, frames))
            })
            .collect();

        let mut sampler = SamplerConfig::with_resolution(8);
        sampler.output_size = 8;
        sampler.empty_policy = EmptyPolicy::Block;
        let reader = SampleReader::new(taps, &sampler).unwrap();
        (reader, sampler)
    }

    fn free_run(capacity: usize, drop_policy: DropPolicy) -> CaptureWorkerConfig {
        CaptureWorkerConfig {
            cadence_hz: 0.0,
            backpressure: BackpressureConfig::new(capacity, drop_policy),
        }
    }

    #[tokio::test]
    async fn test_worker_forwards_samples_until_queues_close() {
        let (reader, sampler) = scripted_rig(2);
        let mut worker =
            CaptureWorker::spawn(reader, sampler, free_run(4, DropPolicy::DropOldest));
        let rx = worker.take_receiver().unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.cycle, 1);
        assert_eq!(first.tensor.size(), 8);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.cycle, 2);
        // 队列脚本耗尽后线程退出，样本通道随之关闭
        assert!(rx.recv().await.is_err());

        worker.join();
        let snapshot = worker.metrics().snapshot();
        assert_eq!(snapshot.samples_captured, 2);
        assert_eq!(snapshot.samples_dropped, 0);
        assert_eq!(snapshot.assembly_errors, 0);
    }

    #[tokio::test]
    async fn test_drop_oldest_keeps_latest_sample() {
        let (reader, sampler) = scripted_rig(3);
        let mut worker =
            CaptureWorker::spawn(reader, sampler, free_run(1, DropPolicy::DropOldest));
        let rx = worker.take_receiver().unwrap();

        // join 前不消费：容量 1 的通道在第 2、3 轮触发背压
        worker.join();

        let survivor = rx.recv().await.unwrap();
        assert_eq!(survivor.cycle, 3);
        assert!(rx.recv().await.is_err());

        let snapshot = worker.metrics().snapshot();
        assert_eq!(snapshot.samples_captured, 3);
        assert_eq!(snapshot.samples_dropped, 2);
    }

    #[tokio::test]
    async fn test_drop_newest_keeps_first_sample() {
        let (reader, sampler) = scripted_rig(3);
        let mut worker =
            CaptureWorker::spawn(reader, sampler, free_run(1, DropPolicy::DropNewest));
        let rx = worker.take_receiver().unwrap();

        worker.join();

        let survivor = rx.recv().await.unwrap();
        assert_eq!(survivor.cycle, 1);
        assert!(rx.recv().await.is_err());

        let snapshot = worker.metrics().snapshot();
        assert_eq!(snapshot.samples_dropped, 2);
    }

    #[tokio::test]
    async fn test_malformed_frame_counted_and_skipped() {
        let taps: Vec<(StreamId, SharedFrameQueue)> = SAMPLE_STREAMS
            .iter()
            .map(|name| {
                let frame = if *name == "rgb" {
                    // 长度与声明的几何不符
                    RawFrame {
                        width: 8,
                        height: 8,
                        format: PixelFormat::Rgb8Planar,
                        data: Bytes::from(vec![0u8; 10]),
                    }
                } else {
                    stream_frame(name, 0)
                };
                (
                    StreamId::new(name),
                    ScriptedQueue::boxed(name, vec![image_packet(name, 0.0, frame)]),
                )
            })
            .collect();
        let mut sampler = SamplerConfig::with_resolution(8);
        sampler.output_size = 8;
        let reader = SampleReader::new(taps, &sampler).unwrap();

        let mut worker =
            CaptureWorker::spawn(reader, sampler, free_run(4, DropPolicy::DropOldest));
        let rx = worker.take_receiver().unwrap();

        worker.join();

        assert!(rx.recv().await.is_err());
        let snapshot = worker.metrics().snapshot();
        assert_eq!(snapshot.samples_captured, 0);
        assert_eq!(snapshot.assembly_errors, 1);
    }
}
