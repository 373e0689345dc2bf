//! 容量为 1 的帧槽队列
//!
//! 设备侧每条输出流持有一个单帧槽位：写入满槽时覆盖旧帧，
//! 读取端因此只会看到最近一次交付 (most-recent-wins)。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use contracts::{FramePacket, FrameQueue, RigError, StreamId};

/// 槽位状态
#[derive(Debug, Default)]
struct Slot {
    frame: Option<FramePacket>,
    closed: bool,
}

#[derive(Debug)]
struct Shared {
    stream: StreamId,
    slot: Mutex<Slot>,
    ready: Condvar,
    /// 被覆盖丢弃的帧数
    overwritten: AtomicU64,
}

/// 生产者句柄
///
/// Drop 时关闭队列，读取端排空槽位后得到 `QueueClosed`。
pub struct LatestQueueSender {
    shared: Arc<Shared>,
}

impl LatestQueueSender {
    /// 写入一帧；槽位已占用时覆盖旧帧
    pub fn push(&self, packet: FramePacket) {
        let mut slot = self.shared.slot.lock().unwrap();
        if slot.frame.replace(packet).is_some() {
            self.shared.overwritten.fetch_add(1, Ordering::Relaxed);
        }
        drop(slot);
        self.shared.ready.notify_one();
    }

    /// 因覆盖而丢弃的帧数
    pub fn overwritten(&self) -> u64 {
        self.shared.overwritten.load(Ordering::Relaxed)
    }
}

impl Drop for LatestQueueSender {
    fn drop(&mut self) {
        let mut slot = self.shared.slot.lock().unwrap();
        slot.closed = true;
        drop(slot);
        self.shared.ready.notify_all();
    }
}

/// 读取端队列，实现 `contracts::FrameQueue`
pub struct LatestFrameQueue {
    shared: Arc<Shared>,
}

impl FrameQueue for LatestFrameQueue {
    fn stream(&self) -> &str {
        self.shared.stream.as_str()
    }

    fn recv(&self) -> Result<FramePacket, RigError> {
        let mut slot = self.shared.slot.lock().unwrap();
        loop {
            if let Some(packet) = slot.frame.take() {
                return Ok(packet);
            }
            if slot.closed {
                return Err(RigError::QueueClosed {
                    stream: self.shared.stream.to_string(),
                });
            }
            slot = self.shared.ready.wait(slot).unwrap();
        }
    }

    fn try_recv(&self) -> Result<Option<FramePacket>, RigError> {
        let mut slot = self.shared.slot.lock().unwrap();
        if let Some(packet) = slot.frame.take() {
            return Ok(Some(packet));
        }
        if slot.closed {
            return Err(RigError::QueueClosed {
                stream: self.shared.stream.to_string(),
            });
        }
        Ok(None)
    }
}

/// 创建一对 (生产者, 读取端)
pub fn latest_channel(stream: StreamId) -> (LatestQueueSender, LatestFrameQueue) {
    let shared = Arc::new(Shared {
        stream,
        slot: Mutex::new(Slot::default()),
        ready: Condvar::new(),
        overwritten: AtomicU64::new(0),
    });
    (
        LatestQueueSender {
            shared: shared.clone(),
        },
        LatestFrameQueue { shared },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::TapPayload;
    use std::thread;
    use std::time::Duration;

    fn packet(stream: &str, sequence: u64) -> FramePacket {
        FramePacket {
            stream: stream.into(),
            timestamp: sequence as f64 * 0.033,
            sequence: Some(sequence),
            payload: TapPayload::Raw(Bytes::from_static(b"frame")),
        }
    }

    #[test]
    fn overwrite_keeps_most_recent() {
        let (sender, queue) = latest_channel("rgb".into());
        sender.push(packet("rgb", 1));
        sender.push(packet("rgb", 2));

        let got = queue.try_recv().unwrap().unwrap();
        assert_eq!(got.sequence, Some(2));
        assert_eq!(sender.overwritten(), 1);
        assert!(queue.try_recv().unwrap().is_none());
    }

    #[test]
    fn recv_blocks_until_push() {
        let (sender, queue) = latest_channel("depth_fac".into());

        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            sender.push(packet("depth_fac", 7));
        });

        let got = queue.recv().unwrap();
        assert_eq!(got.sequence, Some(7));
        producer.join().unwrap();
    }

    #[test]
    fn dropped_sender_drains_then_closes() {
        let (sender, queue) = latest_channel("depth_dist".into());
        sender.push(packet("depth_dist", 3));
        drop(sender);

        assert_eq!(queue.recv().unwrap().sequence, Some(3));
        let err = queue.recv().unwrap_err();
        assert!(matches!(err, RigError::QueueClosed { .. }));
        assert!(queue.try_recv().is_err());
    }

    #[test]
    fn try_recv_on_empty_open_queue_is_none() {
        let (_sender, queue) = latest_channel("depth_conf".into());
        assert!(queue.try_recv().unwrap().is_none());
    }
}
