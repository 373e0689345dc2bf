//! 张量组装：一个帧集合进，一个 CHW 样本出。

use contracts::{
    CapturedSample, FrameSet, PixelFormat, RawFrame, RigError, SampleTensor, SamplerConfig,
    StreamId,
};
use ndarray::Array3;
use tracing::trace;

use crate::crop::crop_resize;
use crate::layout::interleaved_to_planar;

/// 把一轮采集的帧集合组装成模型输入样本。
///
/// 输出张量的通道顺序：
/// - 0..=2: 彩色预览 (R, G, B 平面)
/// - 3: 视差
///
/// 绝对深度与置信度不进张量，以裁剪对齐后的方形帧随样本返回，
/// u16 深度数据保持原值。
pub fn assemble(set: &FrameSet, config: &SamplerConfig) -> Result<CapturedSample, RigError> {
    let [color_stream, disparity_stream, depth_stream, confidence_stream] = &config.streams;
    let size = config.output_size;

    let color = set.frame(color_stream.as_str())?;
    let disparity = set.frame(disparity_stream.as_str())?;
    let depth = set.frame(depth_stream.as_str())?;
    let confidence = set.frame(confidence_stream.as_str())?;

    expect_format(
        color_stream,
        color,
        &[PixelFormat::Rgb8Planar, PixelFormat::Rgb8],
    )?;
    expect_format(disparity_stream, disparity, &[PixelFormat::Gray8])?;
    expect_format(depth_stream, depth, &[PixelFormat::Gray16])?;
    expect_format(confidence_stream, confidence, &[PixelFormat::Gray8])?;

    let color_sq = crop_resize(color, size)?;
    let disparity_sq = crop_resize(disparity, size)?;
    let depth_sq = crop_resize(depth, size)?;
    let confidence_sq = crop_resize(confidence, size)?;

    let side = size as usize;
    let mut stacked = Vec::with_capacity(SampleTensor::CHANNELS * side * side);
    match color_sq.format {
        // 平面彩色已经是 CHW，直接进张量
        PixelFormat::Rgb8Planar => stacked.extend_from_slice(&color_sq.data),
        _ => stacked.extend_from_slice(&interleaved_to_planar(&color_sq.data, size, size)?),
    }
    stacked.extend_from_slice(&disparity_sq.data);

    let array = Array3::from_shape_vec((SampleTensor::CHANNELS, side, side), stacked)
        .map_err(|e| RigError::frame_layout(color_stream.as_str(), format!("tensor shape: {e}")))?;
    let tensor = SampleTensor::new(array)?;

    trace!(cycle = set.cycle, t_capture = set.t_capture, "sample assembled");

    Ok(CapturedSample {
        t_capture: set.t_capture,
        cycle: set.cycle,
        tensor,
        depth: depth_sq,
        confidence: confidence_sq,
        meta: set.meta.clone(),
    })
}

fn expect_format(
    stream: &StreamId,
    frame: &RawFrame,
    allowed: &[PixelFormat],
) -> Result<(), RigError> {
    if allowed.contains(&frame.format) {
        return Ok(());
    }
    Err(RigError::frame_layout(
        stream.as_str(),
        format!("unexpected pixel format {:?}", frame.format),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::CaptureMeta;
    use std::collections::HashMap;

    fn test_config(size: u32) -> SamplerConfig {
        let mut config = SamplerConfig::with_resolution(size);
        config.output_size = size;
        config
    }

    fn planar_color(size: u32, r: u8, g: u8, b: u8) -> RawFrame {
        let plane = (size * size) as usize;
        let mut data = vec![r; plane];
        data.extend(vec![g; plane]);
        data.extend(vec![b; plane]);
        RawFrame {
            width: size,
            height: size,
            format: PixelFormat::Rgb8Planar,
            data: Bytes::from(data),
        }
    }

    fn gray8_frame(width: u32, height: u32, value: u8) -> RawFrame {
        RawFrame {
            width,
            height,
            format: PixelFormat::Gray8,
            data: Bytes::from(vec![value; (width * height) as usize]),
        }
    }

    fn gray16_frame(width: u32, height: u32, value: u16) -> RawFrame {
        let values = vec![value; (width * height) as usize];
        RawFrame {
            width,
            height,
            format: PixelFormat::Gray16,
            data: Bytes::from(bytemuck::cast_slice::<u16, u8>(&values).to_vec()),
        }
    }

    fn frame_set(config: &SamplerConfig, frames: Vec<RawFrame>) -> FrameSet {
        let mut map = HashMap::new();
        for (stream, frame) in config.streams.iter().zip(frames) {
            map.insert(stream.clone(), frame);
        }
        FrameSet {
            t_capture: 12.5,
            cycle: 3,
            frames: map,
            meta: CaptureMeta {
                poll_micros: 42,
                ..CaptureMeta::default()
            },
        }
    }

    #[test]
    fn test_assemble_stacks_color_then_disparity() {
        let config = test_config(8);
        let set = frame_set(
            &config,
            vec![
                planar_color(8, 10, 20, 30),
                gray8_frame(12, 8, 40),
                gray16_frame(12, 8, 1000),
                gray8_frame(12, 8, 200),
            ],
        );

        let sample = assemble(&set, &config).unwrap();

        assert_eq!(sample.tensor.size(), 8);
        for (channel, expected) in [(0, 10u8), (1, 20), (2, 30), (3, 40)] {
            let plane = sample.tensor.channel(channel).unwrap();
            assert!(
                plane.iter().all(|&v| v == expected),
                "channel {channel} should be constant {expected}"
            );
        }

        assert_eq!(sample.depth.width, 8);
        assert_eq!(sample.depth.format, PixelFormat::Gray16);
        let depth: Vec<u16> = bytemuck::pod_collect_to_vec(&sample.depth.data[..]);
        assert!(depth.iter().all(|&v| v == 1000));

        assert_eq!(sample.confidence.width, 8);
        assert!(sample.confidence.data.iter().all(|&v| v == 200));

        // 采集上下文原样带出
        assert_eq!(sample.t_capture, 12.5);
        assert_eq!(sample.cycle, 3);
        assert_eq!(sample.meta.poll_micros, 42);
    }

    #[test]
    fn test_assemble_requires_all_streams() {
        let config = test_config(8);
        let mut set = frame_set(
            &config,
            vec![
                planar_color(8, 1, 2, 3),
                gray8_frame(12, 8, 0),
                gray16_frame(12, 8, 0),
                gray8_frame(12, 8, 0),
            ],
        );
        set.frames.remove(&config.streams[3]);

        assert!(matches!(
            assemble(&set, &config),
            Err(RigError::FrameLayout { .. })
        ));
    }

    #[test]
    fn test_assemble_rejects_gray_color() {
        let config = test_config(8);
        let set = frame_set(
            &config,
            vec![
                gray8_frame(8, 8, 1),
                gray8_frame(12, 8, 0),
                gray16_frame(12, 8, 0),
                gray8_frame(12, 8, 0),
            ],
        );

        assert!(matches!(
            assemble(&set, &config),
            Err(RigError::FrameLayout { .. })
        ));
    }

    #[test]
    fn test_assemble_accepts_interleaved_color() {
        let config = test_config(4);
        let pixels: Vec<u8> = std::iter::repeat([1u8, 2, 3]).take(16).flatten().collect();
        let color = RawFrame {
            width: 4,
            height: 4,
            format: PixelFormat::Rgb8,
            data: Bytes::from(pixels),
        };
        let set = frame_set(
            &config,
            vec![
                color,
                gray8_frame(6, 4, 9),
                gray16_frame(6, 4, 500),
                gray8_frame(6, 4, 7),
            ],
        );

        let sample = assemble(&set, &config).unwrap();
        assert!(sample.tensor.channel(0).unwrap().iter().all(|&v| v == 1));
        assert!(sample.tensor.channel(1).unwrap().iter().all(|&v| v == 2));
        assert!(sample.tensor.channel(2).unwrap().iter().all(|&v| v == 3));
        assert!(sample.tensor.channel(3).unwrap().iter().all(|&v| v == 9));
    }

    #[test]
    fn test_assemble_at_device_geometry() {
        // 设备真实几何：256 预览 + 640x400 深度族
        let config = test_config(256);
        let set = frame_set(
            &config,
            vec![
                planar_color(256, 5, 6, 7),
                gray8_frame(640, 400, 80),
                gray16_frame(640, 400, 2500),
                gray8_frame(640, 400, 255),
            ],
        );

        let sample = assemble(&set, &config).unwrap();
        assert_eq!(sample.tensor.size(), 256);
        assert_eq!(sample.tensor.as_bytes().len(), 4 * 256 * 256);
        assert!(sample.tensor.channel(3).unwrap().iter().all(|&v| v == 80));
        assert_eq!(sample.depth.width, 256);
        assert_eq!(sample.depth.height, 256);
        let depth: Vec<u16> = bytemuck::pod_collect_to_vec(&sample.depth.data[..]);
        assert!(depth.iter().all(|&v| v == 2500));
    }

    #[test]
    fn test_assemble_follows_configured_stream_names() {
        let mut config = test_config(4);
        config.streams = ["cam", "disp", "dist", "conf"].map(StreamId::new);
        let set = frame_set(
            &config,
            vec![
                planar_color(4, 1, 1, 1),
                gray8_frame(6, 4, 2),
                gray16_frame(6, 4, 3),
                gray8_frame(6, 4, 4),
            ],
        );

        let sample = assemble(&set, &config).unwrap();
        assert_eq!(sample.cycle, 3);
        assert!(sample.tensor.channel(3).unwrap().iter().all(|&v| v == 2));
    }
}
