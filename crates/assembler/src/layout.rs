//! Pixel layout conversion between planar (CHW) and interleaved (HWC).

use contracts::RigError;

/// Convert a 3-channel planar buffer into interleaved pixel order.
///
/// Planar input stores the full R, G and B planes back to back; the output
/// stores one `[r, g, b]` triple per pixel in row-major order.
pub fn planar_to_interleaved(planes: &[u8], width: u32, height: u32) -> Result<Vec<u8>, RigError> {
    let plane = plane_len(planes.len(), width, height)?;
    let mut pixels = Vec::with_capacity(plane * 3);
    for i in 0..plane {
        pixels.push(planes[i]);
        pixels.push(planes[plane + i]);
        pixels.push(planes[2 * plane + i]);
    }
    Ok(pixels)
}

/// Convert a 3-channel interleaved buffer back into planar order.
pub fn interleaved_to_planar(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>, RigError> {
    let plane = plane_len(pixels.len(), width, height)?;
    let mut planes = vec![0u8; plane * 3];
    for i in 0..plane {
        planes[i] = pixels[3 * i];
        planes[plane + i] = pixels[3 * i + 1];
        planes[2 * plane + i] = pixels[3 * i + 2];
    }
    Ok(planes)
}

fn plane_len(actual: usize, width: u32, height: u32) -> Result<usize, RigError> {
    let plane = width as usize * height as usize;
    if actual != plane * 3 {
        return Err(RigError::bad_geometry(
            width,
            height,
            format!("3-channel buffer is {actual} bytes, expected {}", plane * 3),
        ));
    }
    Ok(plane)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planar_to_interleaved_pixel_order() {
        // 2x1 image: R=[1,2] G=[3,4] B=[5,6]
        let planes = [1u8, 2, 3, 4, 5, 6];
        let pixels = planar_to_interleaved(&planes, 2, 1).unwrap();
        assert_eq!(pixels, vec![1, 3, 5, 2, 4, 6]);
    }

    #[test]
    fn test_interleaved_to_planar_pixel_order() {
        let pixels = [1u8, 3, 5, 2, 4, 6];
        let planes = interleaved_to_planar(&pixels, 2, 1).unwrap();
        assert_eq!(planes, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_round_trip_restores_input() {
        let planes: Vec<u8> = (0..3 * 4 * 2).map(|i| i as u8).collect();
        let pixels = planar_to_interleaved(&planes, 4, 2).unwrap();
        assert_eq!(interleaved_to_planar(&pixels, 4, 2).unwrap(), planes);
    }

    #[test]
    fn test_layout_rejects_short_buffer() {
        assert!(planar_to_interleaved(&[0u8; 5], 2, 1).is_err());
        assert!(interleaved_to_planar(&[0u8; 7], 2, 1).is_err());
    }
}
