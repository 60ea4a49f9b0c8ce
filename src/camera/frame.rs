//! Conversions from raw camera buffers to display-ready RGBA frames.

use anyhow::{anyhow, ensure, Result};
use image::{
    imageops::{flip_horizontal, rotate180, rotate270, rotate90},
    RgbaImage,
};

use super::PreviewFrame;

/// Borrowed planes of a YUV 4:2:0 image. Covers both planar (I420) and
/// semi-planar (NV12/NV21) layouts through the chroma pixel stride.
pub struct YuvPlanes<'a> {
    pub y: &'a [u8],
    pub u: &'a [u8],
    pub v: &'a [u8],
    pub y_row_stride: usize,
    pub uv_row_stride: usize,
    pub uv_pixel_stride: usize,
}

impl YuvPlanes<'_> {
    fn check(&self, width: usize, height: usize) -> Result<()> {
        ensure!(width > 0 && height > 0, "empty image {width}x{height}");
        let y_needed = (height - 1) * self.y_row_stride + width;
        ensure!(
            self.y.len() >= y_needed,
            "Y plane too short: {} < {y_needed}",
            self.y.len()
        );
        let uv_needed =
            ((height - 1) / 2) * self.uv_row_stride + ((width - 1) / 2) * self.uv_pixel_stride + 1;
        ensure!(
            self.u.len() >= uv_needed && self.v.len() >= uv_needed,
            "chroma planes too short: u={} v={} need {uv_needed}",
            self.u.len(),
            self.v.len()
        );
        Ok(())
    }
}

// BT.601 limited range, fixed point with 10 fractional bits.
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = (y as i32 - 16).max(0) * 1192;
    let u = u as i32 - 128;
    let v = v as i32 - 128;
    let r = (y + 1634 * v).clamp(0, 262143) >> 10;
    let g = (y - 833 * v - 400 * u).clamp(0, 262143) >> 10;
    let b = (y + 2066 * u).clamp(0, 262143) >> 10;
    [r as u8, g as u8, b as u8]
}

/// Decodes into `rgba`, resizing it to `width * height * 4`.
pub fn yuv420_to_rgba(
    planes: &YuvPlanes,
    width: u32,
    height: u32,
    rgba: &mut Vec<u8>,
) -> Result<()> {
    let (width, height) = (width as usize, height as usize);
    planes.check(width, height)?;
    rgba.resize(width * height * 4, 0);
    for row in 0..height {
        let y_row = row * planes.y_row_stride;
        let uv_row = (row / 2) * planes.uv_row_stride;
        let out_row = &mut rgba[row * width * 4..(row + 1) * width * 4];
        for (col, pixel) in out_row.chunks_exact_mut(4).enumerate() {
            let uv = uv_row + (col / 2) * planes.uv_pixel_stride;
            let [r, g, b] = yuv_to_rgb(planes.y[y_row + col], planes.u[uv], planes.v[uv]);
            pixel.copy_from_slice(&[r, g, b, 255]);
        }
    }
    Ok(())
}

/// Swaps BGRA byte order to RGBA in place.
pub fn bgra_to_rgba(data: &mut [u8]) {
    for pixel in data.chunks_exact_mut(4) {
        pixel.swap(0, 2);
    }
}

/// Rotates clockwise by `rotation` degrees (multiples of 90) and optionally
/// mirrors, as needed to show a sensor image upright.
pub fn orient(
    rgba: Vec<u8>,
    width: u32,
    height: u32,
    rotation: i32,
    mirror: bool,
) -> Result<RgbaImage> {
    let image = RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| anyhow!("buffer does not hold a {width}x{height} RGBA image"))?;
    let rotated = match rotation.rem_euclid(360) {
        0 => image,
        90 => rotate90(&image),
        180 => rotate180(&image),
        270 => rotate270(&image),
        other => return Err(anyhow!("unsupported rotation {other}")),
    };
    Ok(if mirror {
        flip_horizontal(&rotated)
    } else {
        rotated
    })
}

pub fn to_preview_frame(image: &RgbaImage) -> PreviewFrame {
    PreviewFrame::clone_from_slice(image.as_raw(), image.width(), image.height())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planar<'a>(y: &'a [u8], u: &'a [u8], v: &'a [u8], width: usize) -> YuvPlanes<'a> {
        YuvPlanes {
            y,
            u,
            v,
            y_row_stride: width,
            uv_row_stride: width / 2,
            uv_pixel_stride: 1,
        }
    }

    #[test]
    fn black_and_white_levels() {
        assert_eq!(yuv_to_rgb(16, 128, 128), [0, 0, 0]);
        assert_eq!(yuv_to_rgb(235, 128, 128), [254, 254, 254]);
        // below black level clamps instead of wrapping
        assert_eq!(yuv_to_rgb(0, 128, 128), [0, 0, 0]);
    }

    #[test]
    fn strong_v_is_red() {
        let [r, g, b] = yuv_to_rgb(81, 90, 240);
        assert!(r > 200 && g < 40 && b < 40, "got {r} {g} {b}");
    }

    #[test]
    fn decodes_planar_gray() {
        let y = [16, 235, 16, 235, 235, 16, 235, 16];
        let u = [128, 128];
        let v = [128, 128];
        let mut rgba = vec![];
        yuv420_to_rgba(&planar(&y, &u, &v, 4), 4, 2, &mut rgba).unwrap();
        assert_eq!(rgba.len(), 4 * 2 * 4);
        assert_eq!(&rgba[0..4], &[0, 0, 0, 255]);
        assert_eq!(&rgba[4..8], &[254, 254, 254, 255]);
        assert_eq!(&rgba[16..20], &[254, 254, 254, 255]);
    }

    #[test]
    fn decodes_semi_planar_with_padding() {
        // 2x2 image, rows padded to 4 bytes, interleaved chroma (NV21: v then u)
        let y = [235, 235, 0, 0, 235, 235, 0, 0];
        let vu = [128, 128];
        let planes = YuvPlanes {
            y: &y,
            u: &vu[1..],
            v: &vu[..1],
            y_row_stride: 4,
            uv_row_stride: 4,
            uv_pixel_stride: 2,
        };
        let mut rgba = vec![];
        yuv420_to_rgba(&planes, 2, 2, &mut rgba).unwrap();
        assert!(rgba.chunks(4).all(|p| p == [254, 254, 254, 255]));
    }

    #[test]
    fn short_planes_are_rejected() {
        let y = [16; 3];
        let u = [128];
        let v = [128];
        let mut rgba = vec![];
        assert!(yuv420_to_rgba(&planar(&y, &u, &v, 2), 2, 2, &mut rgba).is_err());
    }

    #[test]
    fn swaps_bgra() {
        let mut data = vec![1, 2, 3, 4, 5, 6, 7, 8];
        bgra_to_rgba(&mut data);
        assert_eq!(data, vec![3, 2, 1, 4, 7, 6, 5, 8]);
    }

    #[test]
    fn rotates_clockwise() {
        // A B  ->  A
        //          B
        let rgba = vec![1, 1, 1, 255, 2, 2, 2, 255];
        let image = orient(rgba, 2, 1, 90, false).unwrap();
        assert_eq!(image.dimensions(), (1, 2));
        assert_eq!(image.get_pixel(0, 0).0, [1, 1, 1, 255]);
        assert_eq!(image.get_pixel(0, 1).0, [2, 2, 2, 255]);
    }

    #[test]
    fn mirrors_after_rotation() {
        let rgba = vec![1, 1, 1, 255, 2, 2, 2, 255];
        let image = orient(rgba, 2, 1, 0, true).unwrap();
        assert_eq!(image.get_pixel(0, 0).0, [2, 2, 2, 255]);
        let upside_down = orient(vec![1, 1, 1, 255, 2, 2, 2, 255], 2, 1, -180, false).unwrap();
        assert_eq!(upside_down.get_pixel(0, 0).0, [2, 2, 2, 255]);
    }

    #[test]
    fn odd_rotation_and_bad_buffer_fail() {
        assert!(orient(vec![0; 4], 1, 1, 45, false).is_err());
        assert!(orient(vec![0; 3], 1, 1, 0, false).is_err());
    }

    #[test]
    fn preview_frame_keeps_dimensions() {
        let image = orient(vec![0; 6 * 4], 3, 2, 270, false).unwrap();
        let frame = to_preview_frame(&image);
        assert_eq!((frame.width(), frame.height()), (2, 3));
    }
}
