//! Template matching on OpenCV.
//!
//! Unmasked templates are scored with `TM_CCOEFF_NORMED`, masked templates
//! with `TM_CCORR_NORMED` restricted to the mask. Every location of the frame
//! is scored at full resolution.

use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use opencv::core::{min_max_loc, patch_na_ns, Mat, Point, Scalar, CV_8UC3};
use opencv::imgproc;
use opencv::prelude::*;

use crate::utils::error::BetclickResult;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProbeMatch {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub score: f32,
    pub scale: f32,
}

/// Finds the best location of `template` in `image` and returns it when its
/// score reaches `threshold`.
pub fn match_template(
    image: &RgbImage,
    template: &RgbImage,
    mask: Option<&GrayImage>,
    threshold: f32,
) -> BetclickResult<Option<ProbeMatch>> {
    Ok(best_match(image, template, mask)?.filter(|m| m.score >= threshold))
}

/// Runs [`match_template`] for every scale and keeps the best score.
pub fn match_multiscale(
    image: &RgbImage,
    template: &RgbImage,
    mask: Option<&GrayImage>,
    scales: &[f32],
    threshold: f32,
) -> BetclickResult<Option<ProbeMatch>> {
    let mut best: Option<ProbeMatch> = None;
    for &scale in scales {
        if !scale.is_finite() || scale <= 0.0 {
            continue;
        }
        let found = if (scale - 1.0).abs() < f32::EPSILON {
            best_match(image, template, mask)?
        } else {
            let (scaled, scaled_mask) = rescale(template, mask, scale);
            best_match(image, &scaled, scaled_mask.as_ref())?
        };
        if let Some(mut m) = found {
            m.scale = scale;
            log::trace!("scale {scale}: score {:.3} at ({}, {})", m.score, m.x, m.y);
            if best.map_or(true, |b| m.score > b.score) {
                best = Some(m);
            }
        }
    }
    Ok(best.filter(|m| m.score >= threshold))
}

fn rescale(template: &RgbImage, mask: Option<&GrayImage>, scale: f32) -> (RgbImage, Option<GrayImage>) {
    let side = |v: u32| ((v as f32 * scale).floor() as u32).max(1);
    let (w, h) = (side(template.width()), side(template.height()));
    let scaled = if scale < 1.0 {
        imageops::thumbnail(template, w, h)
    } else {
        imageops::resize(template, w, h, FilterType::Triangle)
    };
    let scaled_mask = mask.map(|m| {
        let mut resized = imageops::resize(m, w, h, FilterType::Nearest);
        for px in resized.pixels_mut() {
            px.0[0] = if px.0[0] >= 128 { 255 } else { 0 };
        }
        resized
    });
    (scaled, scaled_mask)
}

fn rgb_to_mat(raw: &[u8], width: u32, height: u32) -> BetclickResult<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(height as i32, width as i32, CV_8UC3, Scalar::all(0.0))?;
    let mat_data = mat.data_bytes_mut()?;
    mat_data.copy_from_slice(raw);
    Ok(mat)
}

// One mask value per template channel.
fn mask_to_mat(mask: &GrayImage) -> BetclickResult<Mat> {
    let spread: Vec<u8> = mask.as_raw().iter().flat_map(|&v| [v; 3]).collect();
    rgb_to_mat(&spread, mask.width(), mask.height())
}

fn best_match(image: &RgbImage, template: &RgbImage, mask: Option<&GrayImage>) -> BetclickResult<Option<ProbeMatch>> {
    let (tw, th) = template.dimensions();
    let (iw, ih) = image.dimensions();
    if tw == 0 || th == 0 || tw > iw || th > ih {
        return Ok(None);
    }

    let image_mat = rgb_to_mat(image.as_raw(), iw, ih)?;
    let template_mat = rgb_to_mat(template.as_raw(), tw, th)?;
    let mut matched = Mat::default();
    match mask {
        Some(m) => {
            if m.dimensions() != template.dimensions() {
                log::warn!("mask size {:?} differs from template size {:?}", m.dimensions(), (tw, th));
                return Ok(None);
            }
            if m.pixels().all(|p| p.0[0] == 0) {
                return Ok(None);
            }
            let mask_mat = mask_to_mat(m)?;
            imgproc::match_template(&image_mat, &template_mat, &mut matched, imgproc::TM_CCORR_NORMED, &mask_mat)?;
        }
        None => {
            let empty_mask = Mat::default();
            imgproc::match_template(&image_mat, &template_mat, &mut matched, imgproc::TM_CCOEFF_NORMED, &empty_mask)?;
        }
    }
    // Windows without energy divide by zero under a mask.
    patch_na_ns(&mut matched, 0.0)?;

    let mut max_val = 0.0;
    let mut max_loc = Point::default();
    min_max_loc(&matched, None, Some(&mut max_val), None, Some(&mut max_loc), &Mat::default())?;
    if !max_val.is_finite() {
        return Ok(None);
    }

    Ok(Some(ProbeMatch {
        x: max_loc.x as u32,
        y: max_loc.y as u32,
        width: tw,
        height: th,
        score: max_val.clamp(-1.0, 1.0) as f32,
        scale: 1.0,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::probe::{bottom_roi, nonwhite_mask, WHITE_THRESHOLD};
    use image::{DynamicImage, Rgb, Rgba, RgbaImage};
    use rstest::{fixture, rstest};

    fn noise(width: u32, height: u32, seed: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let mut h = x.wrapping_mul(73_856_093) ^ y.wrapping_mul(19_349_663) ^ seed.wrapping_mul(83_492_791);
            h ^= h >> 13;
            h = h.wrapping_mul(0x5bd1_e995);
            h ^= h >> 15;
            Rgb([(h & 0xff) as u8, ((h >> 8) & 0xff) as u8, ((h >> 16) & 0xff) as u8])
        })
    }

    fn crop(image: &RgbImage, x: u32, y: u32, w: u32, h: u32) -> RgbImage {
        imageops::crop_imm(image, x, y, w, h).to_image()
    }

    /// Chip face of `block`-sized colour cells inside a white ring `ring` px wide.
    fn chip(size: u32, ring: u32, block: u32) -> RgbaImage {
        let cells = noise(size / block + 1, size / block + 1, 21);
        RgbaImage::from_fn(size, size, |x, y| {
            let face = x >= ring && y >= ring && x < size - ring && y < size - ring;
            if face {
                let [r, g, b] = cells.get_pixel(x / block, y / block).0;
                Rgba([r.min(200), g.min(200), b.min(200), 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        })
    }

    // Copies only the coloured face; the ring keeps the frame underneath.
    fn stamp(frame: &mut RgbImage, chip: &RgbaImage, x0: u32, y0: u32) {
        for (x, y, px) in chip.enumerate_pixels() {
            let [r, g, b, _] = px.0;
            if r < WHITE_THRESHOLD || g < WHITE_THRESHOLD || b < WHITE_THRESHOLD {
                frame.put_pixel(x0 + x, y0 + y, Rgb([r, g, b]));
            }
        }
    }

    #[fixture]
    fn frame() -> RgbImage {
        noise(120, 90, 7)
    }

    #[rstest]
    fn test_exact_template_is_found(frame: RgbImage) {
        let template = crop(&frame, 40, 30, 16, 12);
        let found = match_template(&frame, &template, None, 0.99).unwrap().unwrap();
        assert_eq!((found.x, found.y, found.width, found.height), (40, 30, 16, 12));
        assert!(found.score > 0.999);
        assert_eq!(found.scale, 1.0);
    }

    #[rstest]
    fn test_template_larger_than_image_is_no_match(frame: RgbImage) {
        let wide = noise(121, 10, 1);
        let tall = noise(10, 91, 1);
        assert_eq!(match_template(&frame, &wide, None, -1.0).unwrap(), None);
        assert_eq!(match_template(&frame, &tall, None, -1.0).unwrap(), None);
    }

    #[rstest]
    fn test_threshold_only_filters(frame: RgbImage) {
        let mut template = crop(&frame, 10, 50, 20, 20);
        for px in template.pixels_mut().take(60) {
            *px = Rgb([0, 0, 0]);
        }
        let loose = match_template(&frame, &template, None, -1.0).unwrap().unwrap();
        for threshold in [0.0, 0.3, 0.5, 0.7] {
            match match_template(&frame, &template, None, threshold).unwrap() {
                Some(m) => {
                    assert_eq!((m.x, m.y), (loose.x, loose.y));
                    assert!(m.score >= threshold);
                }
                None => assert!(loose.score < threshold),
            }
        }
        assert_eq!(match_template(&frame, &template, None, loose.score + 0.01).unwrap(), None);
    }

    #[rstest]
    fn test_masked_match_ignores_background(frame: RgbImage) {
        let mut target = frame.clone();
        let template = chip(14, 3, 2);
        stamp(&mut target, &template, 60, 20);

        let mask = nonwhite_mask(&template, WHITE_THRESHOLD);
        let rgb = DynamicImage::ImageRgba8(template).to_rgb8();
        let found = match_template(&target, &rgb, Some(&mask), 0.95).unwrap().unwrap();
        assert_eq!((found.x, found.y), (60, 20));
    }

    #[test]
    fn test_empty_or_mismatched_mask_is_no_match() {
        let frame = noise(20, 20, 3);
        let template = crop(&frame, 0, 0, 5, 5);
        let empty = GrayImage::new(5, 5);
        let wrong_size = GrayImage::from_pixel(4, 5, image::Luma([255]));
        assert_eq!(match_template(&frame, &template, Some(&empty), -1.0).unwrap(), None);
        assert_eq!(match_template(&frame, &template, Some(&wrong_size), -1.0).unwrap(), None);
    }

    #[test]
    fn test_roi_offset_maps_back_to_frame() {
        let frame = noise(80, 80, 11);
        let template = crop(&frame, 12, 60, 10, 10);
        let (roi, y0) = bottom_roi(&frame, 0.5);
        let found = match_template(&roi, &template, None, 0.99).unwrap().unwrap();
        assert_eq!((found.x, found.y + y0), (12, 60));
    }

    #[test]
    fn test_multiscale_reports_winning_scale() {
        let frame = noise(100, 100, 5);
        let template = crop(&frame, 30, 40, 20, 20);
        let enlarged = imageops::resize(&template, 40, 40, FilterType::Nearest);

        let found = match_multiscale(&frame, &enlarged, None, &[2.0, 0.5, 1.0], 0.9).unwrap().unwrap();
        assert_eq!(found.scale, 0.5);
        assert_eq!((found.width, found.height), (20, 20));
        assert_eq!((found.x, found.y), (30, 40));
    }

    #[test]
    fn test_multiscale_skips_oversized_and_invalid_scales() {
        let frame = noise(30, 30, 2);
        let template = crop(&frame, 5, 5, 20, 20);
        assert!(match_multiscale(&frame, &template, None, &[3.0, 0.0, -1.0, f32::NAN], -1.0).unwrap().is_none());
        assert!(match_multiscale(&frame, &template, None, &[3.0, 1.0], 0.99).unwrap().is_some());
    }

    // The on-screen chip is always chip(20, 4, 4); the stored template is the
    // same chip at 1 / scale.
    #[rstest]
    #[case(0.5, 40, 8, 8)]
    #[case(2.0, 10, 2, 2)]
    fn test_masked_multiscale_finds_rescaled_chip(
        #[case] scale: f32,
        #[case] size: u32,
        #[case] ring: u32,
        #[case] block: u32,
    ) {
        let mut frame = noise(200, 150, 13);
        stamp(&mut frame, &chip(20, 4, 4), 130, 90);

        let stored = chip(size, ring, block);
        let mask = nonwhite_mask(&stored, WHITE_THRESHOLD);
        let rgb = DynamicImage::ImageRgba8(stored).to_rgb8();

        let (scaled, scaled_mask) = rescale(&rgb, Some(&mask), scale);
        let scaled_mask = scaled_mask.unwrap();
        assert_eq!(scaled.dimensions(), (20, 20));
        assert!(scaled_mask.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        assert_eq!(scaled_mask.get_pixel(0, 0).0[0], 0);
        assert_eq!(scaled_mask.get_pixel(10, 10).0[0], 255);

        let found = match_multiscale(&frame, &rgb, Some(&mask), &[scale], 0.9).unwrap().unwrap();
        assert_eq!((found.x, found.y), (130, 90));
        assert_eq!((found.width, found.height), (20, 20));
        assert_eq!(found.scale, scale);
    }

    #[test]
    fn test_fine_checker_chip_on_large_noisy_frame() {
        let mut frame = noise(1000, 700, 31);
        let checker = RgbImage::from_fn(40, 40, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([230, 230, 230])
            } else {
                Rgb([20, 20, 20])
            }
        });
        imageops::replace(&mut frame, &checker, 421, 613);

        let found = match_template(&frame, &checker, None, 0.9).unwrap().unwrap();
        assert_eq!((found.x, found.y), (421, 613));
        assert!(found.score > 0.99);
    }

    #[test]
    fn test_marker_on_large_gradient_frame() {
        let mut frame = RgbImage::from_fn(800, 600, |x, y| {
            Rgb([(x / 3 % 256) as u8, (y / 2 % 256) as u8, ((x + y) / 5 % 256) as u8])
        });
        let marker = noise(64, 48, 99);
        imageops::replace(&mut frame, &marker, 516, 332);

        let found = match_template(&frame, &marker, None, 0.95).unwrap().unwrap();
        assert_eq!((found.x, found.y), (516, 332));
        assert!(found.score > 0.999);
    }
}
