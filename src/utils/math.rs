use rand::Rng;
use std::f32::consts::PI;

use crate::layer::Padding;

/// Box-Muller transform to generate normal distribution
pub fn normal_sample<R: Rng + ?Sized>(rng: &mut R, mean: f32, std_dev: f32) -> f32 {
    // u1 in (0, 1] so ln never sees zero
    let u1 = 1.0 - rng.random::<f32>();
    let u2 = rng.random::<f32>();

    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
    mean + std_dev * z
}

/// Spatial output length of a convolution or pooling window.
///
/// Returns `None` when a valid window does not fit the input.
pub fn conv_out_length(
    in_length: usize,
    window: usize,
    stride: usize,
    padding: Padding,
) -> Option<usize> {
    if stride == 0 || window == 0 {
        return None;
    }
    match padding {
        Padding::Valid => {
            if in_length < window {
                None
            } else {
                Some((in_length - window) / stride + 1)
            }
        }
        Padding::Same => Some(in_length.div_ceil(stride)),
    }
}

/// Spatial output length of a transposed convolution.
pub fn deconv_out_length(
    in_length: usize,
    window: usize,
    stride: usize,
    padding: Padding,
) -> Option<usize> {
    if stride == 0 || window == 0 || in_length == 0 {
        return None;
    }
    match padding {
        Padding::Valid => (in_length - 1).checked_mul(stride)?.checked_add(window),
        Padding::Same => in_length.checked_mul(stride),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn valid_conv_length() {
        assert_eq!(conv_out_length(32, 5, 1, Padding::Valid), Some(28));
        assert_eq!(conv_out_length(28, 2, 2, Padding::Valid), Some(14));
        assert_eq!(conv_out_length(7, 3, 2, Padding::Valid), Some(3));
        assert_eq!(conv_out_length(2, 3, 1, Padding::Valid), None);
    }

    #[test]
    fn same_conv_length_is_ceil() {
        assert_eq!(conv_out_length(32, 3, 1, Padding::Same), Some(32));
        assert_eq!(conv_out_length(7, 3, 2, Padding::Same), Some(4));
    }

    #[test]
    fn deconv_lengths() {
        assert_eq!(deconv_out_length(4, 3, 2, Padding::Valid), Some(9));
        assert_eq!(deconv_out_length(4, 3, 2, Padding::Same), Some(8));
        assert_eq!(deconv_out_length(0, 3, 2, Padding::Same), None);
        assert_eq!(deconv_out_length(usize::MAX, 3, 2, Padding::Same), None);
    }

    #[test]
    fn normal_sample_is_finite() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            assert!(normal_sample(&mut rng, 0.0, 1.0).is_finite());
        }
    }
}
