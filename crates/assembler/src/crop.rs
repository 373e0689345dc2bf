//! Center-crop and bilinear resize.
//!
//! Wide frames (width > height) lose their side margins, keeping exactly
//! `height` centered columns, then scale to the configured square output.

use bytes::Bytes;
use contracts::{PixelFormat, RawFrame, RigError};
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma, Pixel, Rgb};

use crate::layout::{interleaved_to_planar, planar_to_interleaved};

/// Left edge of the centered crop window.
///
/// The window keeps exactly `height` columns; an odd margin leaves the
/// spare column on the right side.
pub fn crop_left(width: u32, height: u32) -> u32 {
    (width - height) / 2
}

/// Center-crop a frame to a square and resize it to `output_size`.
///
/// The pixel format is preserved. Frames already at the output geometry
/// pass through untouched, so applying the transform twice equals
/// applying it once.
pub fn crop_resize(frame: &RawFrame, output_size: u32) -> Result<RawFrame, RigError> {
    if output_size == 0 {
        return Err(RigError::bad_geometry(0, 0, "output size must be non-zero"));
    }
    if frame.width < frame.height {
        return Err(RigError::bad_geometry(
            frame.width,
            frame.height,
            "center crop expects width >= height",
        ));
    }
    if frame.width == output_size && frame.height == output_size {
        return Ok(frame.clone());
    }

    let left = crop_left(frame.width, frame.height);
    let data = match frame.format {
        PixelFormat::Gray8 => {
            let img: ImageBuffer<Luma<u8>, Vec<u8>> =
                ImageBuffer::from_raw(frame.width, frame.height, frame.data.to_vec())
                    .ok_or_else(|| length_mismatch(frame))?;
            Bytes::from(square_pass(&img, left, frame.height, output_size).into_raw())
        }
        PixelFormat::Gray16 => {
            if frame.data.len() % 2 != 0 {
                return Err(length_mismatch(frame));
            }
            let values: Vec<u16> = bytemuck::pod_collect_to_vec(&frame.data[..]);
            let img: ImageBuffer<Luma<u16>, Vec<u16>> =
                ImageBuffer::from_raw(frame.width, frame.height, values)
                    .ok_or_else(|| length_mismatch(frame))?;
            let sized = square_pass(&img, left, frame.height, output_size);
            Bytes::from(bytemuck::cast_slice::<u16, u8>(sized.as_raw()).to_vec())
        }
        PixelFormat::Rgb8 => {
            let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
                ImageBuffer::from_raw(frame.width, frame.height, frame.data.to_vec())
                    .ok_or_else(|| length_mismatch(frame))?;
            Bytes::from(square_pass(&img, left, frame.height, output_size).into_raw())
        }
        PixelFormat::Rgb8Planar => {
            let pixels = planar_to_interleaved(&frame.data, frame.width, frame.height)?;
            let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
                ImageBuffer::from_raw(frame.width, frame.height, pixels)
                    .ok_or_else(|| length_mismatch(frame))?;
            let sized = square_pass(&img, left, frame.height, output_size);
            Bytes::from(interleaved_to_planar(sized.as_raw(), output_size, output_size)?)
        }
    };

    Ok(RawFrame {
        width: output_size,
        height: output_size,
        format: frame.format,
        data,
    })
}

/// Crop to the centered `height` x `height` window, then resize if the
/// square does not already match the output edge.
fn square_pass<P>(
    img: &ImageBuffer<P, Vec<P::Subpixel>>,
    left: u32,
    height: u32,
    output_size: u32,
) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel + 'static,
    P::Subpixel: 'static,
{
    let square = imageops::crop_imm(img, left, 0, height, height).to_image();
    if square.width() == output_size {
        square
    } else {
        imageops::resize(&square, output_size, output_size, FilterType::Triangle)
    }
}

fn length_mismatch(frame: &RawFrame) -> RigError {
    RigError::bad_geometry(
        frame.width,
        frame.height,
        format!(
            "buffer is {} bytes, geometry needs {}",
            frame.data.len(),
            frame.expected_len()
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray8(width: u32, height: u32, data: Vec<u8>) -> RawFrame {
        RawFrame {
            width,
            height,
            format: PixelFormat::Gray8,
            data: Bytes::from(data),
        }
    }

    #[test]
    fn test_crop_left_floors_odd_margin() {
        assert_eq!(crop_left(300, 200), 50);
        assert_eq!(crop_left(7, 4), 1);
        assert_eq!(crop_left(4, 4), 0);
    }

    #[test]
    fn test_wide_frame_keeps_centered_columns() {
        // 300x200 keeps columns [50, 250)
        let mut data = vec![0u8; 300 * 200];
        for y in 0..200usize {
            for x in 0..300usize {
                data[y * 300 + x] = ((x * 31 + y * 7) % 251) as u8;
            }
        }
        let out = crop_resize(&gray8(300, 200, data), 200).unwrap();
        assert_eq!(out.width, 200);
        assert_eq!(out.height, 200);
        for y in [0usize, 97, 199] {
            for i in [0usize, 1, 100, 199] {
                let x = 50 + i;
                assert_eq!(
                    out.data[y * 200 + i],
                    ((x * 31 + y * 7) % 251) as u8,
                    "column window should start at 50"
                );
            }
        }
    }

    #[test]
    fn test_odd_margin_keeps_height_columns() {
        // 7x4 has a margin of 3, split 1 left / 2 right
        let data: Vec<u8> = (0u8..28).collect();
        let out = crop_resize(&gray8(7, 4, data), 4).unwrap();
        let expected: Vec<u8> = (0u8..4)
            .flat_map(|y| (1u8..5).map(move |x| y * 7 + x))
            .collect();
        assert_eq!(&out.data[..], &expected[..]);
    }

    #[test]
    fn test_portrait_frame_rejected() {
        let frame = gray8(200, 300, vec![0; 200 * 300]);
        assert!(matches!(
            crop_resize(&frame, 256),
            Err(RigError::BadGeometry { .. })
        ));
    }

    #[test]
    fn test_exact_size_passes_through() {
        let data: Vec<u8> = (0u8..=255).collect();
        let frame = gray8(16, 16, data.clone());
        let out = crop_resize(&frame, 16).unwrap();
        assert_eq!(&out.data[..], &data[..]);
    }

    #[test]
    fn test_square_frame_resizes_without_crop() {
        // 8x8, left half 10, right half 200
        let mut data = vec![10u8; 64];
        for y in 0..8usize {
            for x in 4..8usize {
                data[y * 8 + x] = 200;
            }
        }
        let out = crop_resize(&gray8(8, 8, data), 4).unwrap();
        assert_eq!((out.width, out.height), (4, 4));
        for y in 0..4usize {
            assert_eq!(out.data[y * 4], 10, "left edge survives");
            assert_eq!(out.data[y * 4 + 3], 200, "right edge survives");
        }
    }

    #[test]
    fn test_transform_is_idempotent() {
        let mut data = vec![0u8; 640 * 400];
        for (i, value) in data.iter_mut().enumerate() {
            *value = (i % 253) as u8;
        }
        let once = crop_resize(&gray8(640, 400, data), 256).unwrap();
        let twice = crop_resize(&once, 256).unwrap();
        assert_eq!(once.data, twice.data);
    }

    #[test]
    fn test_resize_preserves_constant_field() {
        let frame = gray8(640, 400, vec![77u8; 640 * 400]);
        let out = crop_resize(&frame, 256).unwrap();
        assert_eq!(out.data.len(), 256 * 256);
        assert!(out.data.iter().all(|&v| v == 77));
    }

    #[test]
    fn test_gray16_crop_keeps_values() {
        // 6x4, crop keeps columns [1, 5)
        let mut values = vec![0u16; 24];
        for y in 0..4usize {
            for x in 0..6usize {
                values[y * 6 + x] = (1000 + x * 100 + y) as u16;
            }
        }
        let frame = RawFrame {
            width: 6,
            height: 4,
            format: PixelFormat::Gray16,
            data: Bytes::from(bytemuck::cast_slice::<u16, u8>(&values).to_vec()),
        };
        let out = crop_resize(&frame, 4).unwrap();
        assert_eq!(out.format, PixelFormat::Gray16);
        let got: Vec<u16> = bytemuck::pod_collect_to_vec(&out.data[..]);
        for y in 0..4usize {
            for i in 0..4usize {
                assert_eq!(got[y * 4 + i], (1000 + (i + 1) * 100 + y) as u16);
            }
        }
    }

    #[test]
    fn test_planar_color_keeps_channel_separation() {
        let plane = 12 * 8;
        let mut data = vec![10u8; plane];
        data.extend(vec![20u8; plane]);
        data.extend(vec![30u8; plane]);
        let frame = RawFrame {
            width: 12,
            height: 8,
            format: PixelFormat::Rgb8Planar,
            data: Bytes::from(data),
        };
        let out = crop_resize(&frame, 8).unwrap();
        assert_eq!(out.format, PixelFormat::Rgb8Planar);
        assert_eq!(out.data.len(), 3 * 8 * 8);
        let plane_out = 8 * 8;
        assert!(out.data[..plane_out].iter().all(|&v| v == 10));
        assert!(out.data[plane_out..2 * plane_out].iter().all(|&v| v == 20));
        assert!(out.data[2 * plane_out..].iter().all(|&v| v == 30));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let frame = gray8(10, 4, vec![0; 39]);
        assert!(crop_resize(&frame, 4).is_err());
    }
}
