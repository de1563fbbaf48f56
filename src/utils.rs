/// Mask value of a pixel that is kept as is.
pub const VALID: u8 = 255;
/// Mask value of a pixel that has to be filled.
pub const HOLE: u8 = 0;

/// Anything short of fully valid is treated as a hole.
#[inline]
pub(crate) fn binarize(value: u8) -> u8 {
    if value < VALID {
        HOLE
    } else {
        VALID
    }
}

pub(crate) fn has_valid_pixel(mask: &image::GrayImage) -> bool {
    mask.pixels().any(|p| p[0] == VALID)
}

// mirrors without repeating the edge sample (`dcb|abcd|cba`)
#[inline]
fn reflect101(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = (2 * len - 2) as isize;
    let r = i.rem_euclid(period) as usize;
    if r < len {
        r
    } else {
        2 * len - 2 - r
    }
}

/// Normalized box filter over `size` x `size` pixels, returning the soft
/// alpha matte in `[0, 1]`, row-major.
pub(crate) fn box_blur_alpha(mask: &image::GrayImage, size: u32) -> Vec<f32> {
    let (width, height) = mask.dimensions();
    let (w, h) = (width as usize, height as usize);
    let before = (size / 2) as isize;
    let after = size as isize - 1 - before;

    // horizontal pass, window sums
    let mut horizontal = vec![0u32; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut sum = 0u32;
            for dx in -before..=after {
                let sx = reflect101(x as isize + dx, w);
                sum += u32::from(mask.get_pixel(sx as u32, y as u32)[0]);
            }
            horizontal[y * w + x] = sum;
        }
    }

    let norm = 1.0 / (f32::from(VALID) * (size * size) as f32);
    let mut alpha = vec![0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut sum = 0u32;
            for dy in -before..=after {
                let sy = reflect101(y as isize + dy, h);
                sum += horizontal[sy * w + x];
            }
            alpha[y * w + x] = sum as f32 * norm;
        }
    }

    alpha
}

/// `alpha * original + (1 - alpha) * solved`, rounded back to 8 bits.
pub(crate) fn composite(
    original: &image::RgbImage,
    solved: &image::RgbImage,
    alpha: &[f32],
) -> image::RgbImage {
    let (width, height) = original.dimensions();
    debug_assert_eq!(solved.dimensions(), (width, height));

    let mut out = image::RgbImage::new(width, height);
    for (i, ((dst, src), pm)) in out
        .pixels_mut()
        .zip(original.pixels())
        .zip(solved.pixels())
        .enumerate()
    {
        let a = alpha[i];
        for c in 0..3 {
            let blended = a * f32::from(src[c]) + (1.0 - a) * f32::from(pm[c]);
            dst[c] = blended.round().max(0.0).min(255.0) as u8;
        }
    }

    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn binarize_is_strict() {
        assert_eq!(binarize(0), HOLE);
        assert_eq!(binarize(254), HOLE);
        assert_eq!(binarize(255), VALID);
    }

    #[test]
    fn blur_of_full_mask_is_opaque() {
        let mask = image::GrayImage::from_pixel(7, 4, image::Luma([VALID]));
        let alpha = box_blur_alpha(&mask, 5);
        assert!(alpha.iter().all(|a| (*a - 1.0).abs() < 1e-6));
    }

    #[test]
    fn blur_softens_a_hole() {
        let mut mask = image::GrayImage::from_pixel(9, 9, image::Luma([VALID]));
        mask.put_pixel(4, 4, image::Luma([HOLE]));
        let alpha = box_blur_alpha(&mask, 3);

        assert!((alpha[4 * 9 + 4] - 8.0 / 9.0).abs() < 1e-6);
        assert!((alpha[3 * 9 + 3] - 8.0 / 9.0).abs() < 1e-6);
        assert!((alpha[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn composite_stays_between_inputs() {
        let original = image::RgbImage::from_pixel(4, 1, image::Rgb([200, 10, 90]));
        let solved = image::RgbImage::from_pixel(4, 1, image::Rgb([20, 250, 91]));
        let alpha = [0.0, 0.3, 0.77, 1.0];

        let out = composite(&original, &solved, &alpha);

        assert_eq!(out.get_pixel(0, 0), solved.get_pixel(0, 0));
        assert_eq!(out.get_pixel(3, 0), original.get_pixel(0, 0));
        for px in out.pixels() {
            for c in 0..3 {
                let (lo, hi) = if original.get_pixel(0, 0)[c] < solved.get_pixel(0, 0)[c] {
                    (original.get_pixel(0, 0)[c], solved.get_pixel(0, 0)[c])
                } else {
                    (solved.get_pixel(0, 0)[c], original.get_pixel(0, 0)[c])
                };
                assert!(px[c] >= lo && px[c] <= hi);
            }
        }
    }
}
