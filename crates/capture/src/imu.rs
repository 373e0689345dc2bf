//! IMU 旁路流监视

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use contracts::{RigError, SharedFrameQueue, TapPayload};
use tracing::{debug, trace, warn};

/// IMU 旁路流监视线程
///
/// 持续排空 "imu" 队列，保持容量 1 的槽位新鲜，并把旋转报告写进
/// 日志与指标。旁路流不参与四流采样循环，样本里也不带它。
pub struct ImuMonitor {
    running: Arc<AtomicBool>,
    reports_seen: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl ImuMonitor {
    /// 启动监视线程。
    pub fn spawn(queue: SharedFrameQueue) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let reports_seen = Arc::new(AtomicU64::new(0));

        let thread_running = Arc::clone(&running);
        let thread_reports = Arc::clone(&reports_seen);
        let handle = thread::spawn(move || {
            debug!(stream = queue.stream(), "imu monitor started");
            while thread_running.load(Ordering::SeqCst) {
                match queue.recv() {
                    Ok(packet) => {
                        if let TapPayload::Imu(report) = packet.payload {
                            thread_reports.fetch_add(1, Ordering::Relaxed);
                            metrics::counter!("capture_imu_reports_total").increment(1);
                            trace!(
                                timestamp = report.timestamp,
                                i = report.rotation.i,
                                j = report.rotation.j,
                                k = report.rotation.k,
                                real = report.rotation.real,
                                "imu rotation"
                            );
                        }
                    }
                    Err(RigError::QueueClosed { .. }) => break,
                    Err(err) => {
                        warn!(error = %err, "imu read failed");
                        break;
                    }
                }
            }
            debug!("imu monitor stopped");
        });

        Self {
            running,
            reports_seen,
            handle: Some(handle),
        }
    }

    /// 已消费的旋转报告数。
    pub fn reports_seen(&self) -> u64 {
        self.reports_seen.load(Ordering::Relaxed)
    }

    /// 请求停止。阻塞中的 `recv` 要等队列关闭才会返回。
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// 等待线程退出。设备关闭 "imu" 队列后线程自行退出。
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ImuMonitor {
    fn drop(&mut self) {
        self.request_stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample_reader::testing::ScriptedQueue;
    use bytes::Bytes;
    use contracts::{FramePacket, ImuReport, PixelFormat, Quaternion, RawFrame};

    fn imu_packet(timestamp: f64) -> FramePacket {
        FramePacket {
            stream: "imu".into(),
            timestamp,
            sequence: None,
            payload: TapPayload::Imu(ImuReport {
                timestamp,
                rotation: Quaternion {
                    i: 0.0,
                    j: 0.0,
                    k: 0.0,
                    real: 1.0,
                },
                accuracy: Some(0.01),
            }),
        }
    }

    #[test]
    fn test_monitor_drains_reports_until_close() {
        let queue = ScriptedQueue::boxed("imu", vec![imu_packet(0.1), imu_packet(0.2)]);
        let mut monitor = ImuMonitor::spawn(queue);

        monitor.join();

        assert_eq!(monitor.reports_seen(), 2);
    }

    #[test]
    fn test_monitor_ignores_image_payload() {
        let stray = FramePacket {
            stream: "imu".into(),
            timestamp: 0.3,
            sequence: None,
            payload: TapPayload::Image(RawFrame {
                width: 2,
                height: 2,
                format: PixelFormat::Gray8,
                data: Bytes::from(vec![0u8; 4]),
            }),
        };
        let queue = ScriptedQueue::boxed("imu", vec![imu_packet(0.1), stray]);
        let mut monitor = ImuMonitor::spawn(queue);

        monitor.join();

        assert_eq!(monitor.reports_seen(), 1);
    }
}
