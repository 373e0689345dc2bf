//! 固定顺序轮询输出队列，产出帧集合。

use std::collections::HashMap;
use std::time::Instant;

use contracts::{
    CaptureMeta, EmptyPolicy, FrameSet, RawFrame, RigError, SamplerConfig, SharedFrameQueue,
    StreamId,
};
use tracing::trace;

/// 采样读取器
///
/// 持有四条输出队列并按固定顺序轮询。队列容量为 1 且写满即覆盖，
/// 所以每次轮询拿到的都是该流当下最新的一帧。彩色预览保持设备原始
/// 布局，深度族的帧在出队时就做居中裁剪 + 缩放。
pub struct SampleReader {
    taps: Vec<(StreamId, SharedFrameQueue)>,
    empty_policy: EmptyPolicy,
    color_stream: StreamId,
    output_size: u32,
    last_seen: HashMap<StreamId, (RawFrame, f64)>,
    cycle: u64,
}

impl SampleReader {
    /// 创建读取器。`taps` 的顺序就是轮询顺序。
    pub fn new(
        taps: Vec<(StreamId, SharedFrameQueue)>,
        config: &SamplerConfig,
    ) -> Result<Self, RigError> {
        if taps.is_empty() {
            return Err(RigError::config_validation(
                "streams",
                "sample reader needs at least one queue",
            ));
        }
        Ok(Self {
            taps,
            empty_policy: config.empty_policy,
            color_stream: config.streams[0].clone(),
            output_size: config.output_size,
            last_seen: HashMap::new(),
            cycle: 0,
        })
    }

    /// 轮询的流名，按轮询顺序。
    pub fn streams(&self) -> impl Iterator<Item = &StreamId> {
        self.taps.iter().map(|(stream, _)| stream)
    }

    /// 采一轮样本：每条流取一帧，打包成帧集合。
    ///
    /// 空队列的行为由 [`EmptyPolicy`] 决定：
    /// - `Block`: 阻塞等生产者的下一帧
    /// - `Stale`: 用该流上次见过的帧顶替，并记入 `meta.stale_streams`
    /// - `Fail`: 返回 [`RigError::NoData`]
    pub fn get_sample(&mut self) -> Result<FrameSet, RigError> {
        let poll_start = Instant::now();
        self.cycle += 1;

        let mut frames = HashMap::with_capacity(self.taps.len());
        let mut meta = CaptureMeta::default();

        for (stream, queue) in &self.taps {
            let fresh = match self.empty_policy {
                EmptyPolicy::Block => Some(queue.recv()?),
                EmptyPolicy::Stale | EmptyPolicy::Fail => queue.try_recv()?,
            };

            let (frame, timestamp) = match fresh {
                Some(packet) => {
                    let timestamp = packet.timestamp;
                    let frame = packet.into_image()?;
                    frame.validate(stream)?;
                    // 彩色流按原始布局透传，深度族裁成输出正方形
                    let frame = if *stream == self.color_stream {
                        frame
                    } else {
                        assembler::crop_resize(&frame, self.output_size)?
                    };
                    self.last_seen
                        .insert(stream.clone(), (frame.clone(), timestamp));
                    (frame, timestamp)
                }
                None if self.empty_policy == EmptyPolicy::Stale => {
                    let (frame, timestamp) =
                        self.last_seen.get(stream).cloned().ok_or_else(|| {
                            RigError::NoData {
                                stream: stream.to_string(),
                            }
                        })?;
                    meta.stale_streams.push(stream.clone());
                    (frame, timestamp)
                }
                None => {
                    return Err(RigError::NoData {
                        stream: stream.to_string(),
                    });
                }
            };

            meta.timestamps.insert(stream.clone(), timestamp);
            frames.insert(stream.clone(), frame);
        }

        meta.poll_micros = poll_start.elapsed().as_micros() as u64;
        // 第一条流 (彩色预览) 的设备时间戳充当整组样本的主时钟
        let t_capture = meta
            .timestamps
            .get(&self.taps[0].0)
            .copied()
            .unwrap_or_default();

        trace!(
            cycle = self.cycle,
            poll_micros = meta.poll_micros,
            stale = meta.stale_streams.len(),
            "sample polled"
        );

        Ok(FrameSet {
            t_capture,
            cycle: self.cycle,
            frames,
            meta,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use contracts::{FramePacket, FrameQueue, RigError, SharedFrameQueue, StreamId};

    /// predetermined frame script; popping past the end acts like a closed queue
    pub(crate) struct ScriptedQueue {
        stream: StreamId,
        frames: Mutex<VecDeque<FramePacket>>,
        closed_when_empty: bool,
    }

    impl ScriptedQueue {
        pub(crate) fn boxed(stream: &str, frames: Vec<FramePacket>) -> SharedFrameQueue {
            Box::new(Self {
                stream: stream.into(),
                frames: Mutex::new(frames.into()),
                closed_when_empty: true,
            })
        }

        /// Empty reads report "no data yet" instead of closing.
        pub(crate) fn open_ended(stream: &str, frames: Vec<FramePacket>) -> SharedFrameQueue {
            Box::new(Self {
                stream: stream.into(),
                frames: Mutex::new(frames.into()),
                closed_when_empty: false,
            })
        }
    }

    impl FrameQueue for ScriptedQueue {
        fn stream(&self) -> &str {
            self.stream.as_str()
        }

        fn recv(&self) -> Result<FramePacket, RigError> {
            self.frames
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| RigError::QueueClosed {
                    stream: self.stream.to_string(),
                })
        }

        fn try_recv(&self) -> Result<Option<FramePacket>, RigError> {
            match self.frames.lock().unwrap().pop_front() {
                Some(packet) => Ok(Some(packet)),
                None if self.closed_when_empty => Err(RigError::QueueClosed {
                    stream: self.stream.to_string(),
                }),
                None => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedQueue;
    use super::*;
    use bytes::Bytes;
    use contracts::{FramePacket, PixelFormat, TapPayload, SAMPLE_STREAMS};
    use rand::Rng;

    fn frame(data: Vec<u8>) -> RawFrame {
        RawFrame {
            width: 4,
            height: 2,
            format: PixelFormat::Gray8,
            data: Bytes::from(data),
        }
    }

    fn packet(stream: &str, timestamp: f64, data: Vec<u8>) -> FramePacket {
        FramePacket {
            stream: stream.into(),
            timestamp,
            sequence: None,
            payload: TapPayload::Image(frame(data)),
        }
    }

    fn scripted_taps(frames_per_stream: usize) -> Vec<(StreamId, SharedFrameQueue)> {
        SAMPLE_STREAMS
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let frames = (0..frames_per_stream)
                    .map(|n| packet(name, 1.0 + i as f64 + n as f64 * 0.1, vec![n as u8; 8]))
                    .collect();
                (StreamId::new(name), ScriptedQueue::boxed(name, frames))
            })
            .collect()
    }

    /// 适配脚本帧几何 (4x2) 的配置：深度族裁剪到 2x2
    fn reader_config(empty_policy: EmptyPolicy) -> SamplerConfig {
        let mut config = SamplerConfig::with_resolution(4);
        config.output_size = 2;
        config.empty_policy = empty_policy;
        config
    }

    #[test]
    fn test_sample_has_one_frame_per_stream() {
        let mut reader =
            SampleReader::new(scripted_taps(1), &reader_config(EmptyPolicy::Block)).unwrap();
        assert_eq!(
            reader.streams().map(StreamId::as_str).collect::<Vec<_>>(),
            SAMPLE_STREAMS
        );

        let set = reader.get_sample().unwrap();

        assert_eq!(set.cycle, 1);
        assert_eq!(set.frames.len(), 4);
        assert_eq!(set.meta.timestamps.len(), 4);
        assert!(set.meta.stale_streams.is_empty());
        // 主时钟取第一条流 (rgb) 的时间戳
        assert_eq!(set.t_capture, 1.0);
    }

    #[test]
    fn test_depth_family_resized_color_kept_native() {
        let mut reader =
            SampleReader::new(scripted_taps(1), &reader_config(EmptyPolicy::Block)).unwrap();

        let set = reader.get_sample().unwrap();

        let rgb = set.frame("rgb").unwrap();
        assert_eq!((rgb.width, rgb.height), (4, 2));
        for name in &SAMPLE_STREAMS[1..] {
            let frame = set.frame(name).unwrap();
            assert_eq!((frame.width, frame.height), (2, 2), "{name}");
        }
    }

    #[test]
    fn test_block_policy_propagates_closed_queue() {
        let mut taps = scripted_taps(1);
        taps[2].1 = ScriptedQueue::boxed("depth_dist", vec![]);
        let mut reader = SampleReader::new(taps, &reader_config(EmptyPolicy::Block)).unwrap();

        assert!(matches!(
            reader.get_sample(),
            Err(RigError::QueueClosed { stream }) if stream == "depth_dist"
        ));
    }

    #[test]
    fn test_stale_policy_serves_cached_frame() {
        let mut rng = rand::rng();
        let noise: Vec<u8> = (0..8).map(|_| rng.random()).collect();

        let mut taps: Vec<(StreamId, SharedFrameQueue)> = SAMPLE_STREAMS
            .iter()
            .map(|name| {
                let frames = vec![
                    packet(name, 1.0, noise.clone()),
                    packet(name, 2.0, vec![9; 8]),
                ];
                (StreamId::new(name), ScriptedQueue::open_ended(name, frames))
            })
            .collect();
        // rgb 只有一帧，第二轮必须用缓存顶替
        taps[0].1 = ScriptedQueue::open_ended("rgb", vec![packet("rgb", 1.0, noise.clone())]);

        let mut reader = SampleReader::new(taps, &reader_config(EmptyPolicy::Stale)).unwrap();

        let first = reader.get_sample().unwrap();
        assert!(first.meta.stale_streams.is_empty());

        let second = reader.get_sample().unwrap();
        assert_eq!(second.meta.stale_streams, vec![StreamId::new("rgb")]);
        assert_eq!(&second.frame("rgb").unwrap().data[..], &noise[..]);
        // 顶替帧沿用它原来的时间戳
        assert_eq!(second.t_capture, 1.0);
        // 深度族的新鲜帧已经是裁剪后的 2x2
        assert_eq!(&second.frame("depth_fac").unwrap().data[..], &[9u8; 4][..]);
    }

    #[test]
    fn test_stale_policy_without_history_errors() {
        let mut taps = scripted_taps(1);
        for (name, tap) in SAMPLE_STREAMS.iter().zip(taps.iter_mut()) {
            if *name == "depth_conf" {
                tap.1 = ScriptedQueue::open_ended(name, vec![]);
            }
        }
        let mut reader = SampleReader::new(taps, &reader_config(EmptyPolicy::Stale)).unwrap();

        assert!(matches!(
            reader.get_sample(),
            Err(RigError::NoData { stream }) if stream == "depth_conf"
        ));
    }

    #[test]
    fn test_fail_policy_surfaces_empty_queue() {
        let mut taps = scripted_taps(1);
        taps[1].1 = ScriptedQueue::open_ended("depth_fac", vec![]);
        let mut reader = SampleReader::new(taps, &reader_config(EmptyPolicy::Fail)).unwrap();

        assert!(matches!(
            reader.get_sample(),
            Err(RigError::NoData { stream }) if stream == "depth_fac"
        ));
    }

    #[test]
    fn test_undersized_frame_rejected() {
        let mut taps = scripted_taps(1);
        taps[0].1 = ScriptedQueue::boxed("rgb", vec![packet("rgb", 1.0, vec![0; 5])]);
        let mut reader = SampleReader::new(taps, &reader_config(EmptyPolicy::Block)).unwrap();

        assert!(matches!(
            reader.get_sample(),
            Err(RigError::FrameLayout { stream, .. }) if stream == "rgb"
        ));
    }

    #[test]
    fn test_reader_requires_queues() {
        assert!(SampleReader::new(Vec::new(), &reader_config(EmptyPolicy::Block)).is_err());
    }

    #[test]
    fn test_cycle_counter_is_monotonic() {
        let mut reader =
            SampleReader::new(scripted_taps(3), &reader_config(EmptyPolicy::Block)).unwrap();
        for expected in 1..=3u64 {
            assert_eq!(reader.get_sample().unwrap().cycle, expected);
        }
    }
}
