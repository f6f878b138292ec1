//! Preprocessing utilities for preparing images for the attitude classifier.
//!
//! The helpers in this module decode uploaded bytes, normalize color space
//! and size, and convert the result into the tensor layout the model was
//! trained against. Serving-time preprocessing must numerically match the
//! training-time scheme; nothing here is randomized or augmented.

use std::borrow::Cow;

use image::{DynamicImage, GenericImageView, RgbImage, imageops::FilterType};
use log::Level;
use tract_onnx::prelude::Tensor;

use attitude_utils::{resize_image, rgb_to_hwc_array, timing_guard};

use crate::error::ClassifyError;

/// Square input edge length the shipped model was trained with.
pub const DEFAULT_TARGET_SIZE: u32 = 160;

/// Fixed resampling filter. CatmullRom matches the bicubic default of the
/// training-side tooling; changing it introduces train/serve skew.
const RESIZE_FILTER: FilterType = FilterType::CatmullRom;

/// Configuration for preprocessing an image before inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessConfig {
    /// Target square edge length in pixels.
    pub target_size: u32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            target_size: DEFAULT_TARGET_SIZE,
        }
    }
}

/// Output of preprocessing: the model-ready tensor plus source metadata.
#[derive(Debug)]
pub struct PreprocessOutput {
    /// NHWC tensor of shape `[1, S, S, 3]`, scaled to `[-1, 1]`.
    pub tensor: Tensor,
    /// The original dimensions of the input image.
    pub original_size: (u32, u32),
}

/// Decode uploaded bytes into an in-memory image.
///
/// # Arguments
///
/// * `bytes` - Raw encoded image bytes (JPEG, PNG, ...).
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, ClassifyError> {
    Ok(image::load_from_memory(bytes)?)
}

/// Preprocess an in-memory image into a model-ready tensor.
///
/// Forces 3-channel RGB, resizes to the configured square resolution with a
/// single fixed filter, scales channel values to `[-1, 1]` per the backbone's
/// scheme, and adds a leading batch dimension of size 1. Identical input
/// always produces a bit-identical tensor.
///
/// # Arguments
///
/// * `image` - The decoded image to process.
/// * `config` - The configuration for preprocessing.
pub fn preprocess_dynamic_image(
    image: &DynamicImage,
    config: &PreprocessConfig,
) -> Result<PreprocessOutput, ClassifyError> {
    let _guard = timing_guard("attitude_core::preprocess", Level::Trace);
    let size = config.target_size;
    if size == 0 {
        return Err(ClassifyError::inference(
            "target size must be greater than zero",
        ));
    }

    let (orig_w, orig_h) = image.dimensions();
    if orig_w == 0 || orig_h == 0 {
        return Err(ClassifyError::inference(
            "source image dimensions must be greater than zero",
        ));
    }

    // An image already at target size skips the resampler entirely so the
    // operation stays idempotent.
    let rgb: Cow<'_, RgbImage> = if orig_w == size && orig_h == size {
        match image.as_rgb8() {
            Some(rgb) => Cow::Borrowed(rgb),
            None => Cow::Owned(image.to_rgb8()),
        }
    } else {
        Cow::Owned(resize_image(image, size, size, RESIZE_FILTER))
    };

    let mut hwc = rgb_to_hwc_array(&rgb);
    hwc.mapv_inplace(scale_pixel);

    let shape = [1usize, size as usize, size as usize, 3];
    let (data, offset) = hwc.into_raw_vec_and_offset();
    debug_assert_eq!(offset, Some(0), "expected contiguous array");
    let tensor = Tensor::from_shape(&shape, &data)
        .map_err(|e| ClassifyError::inference(format!("failed to build input tensor: {e}")))?;

    Ok(PreprocessOutput {
        tensor,
        original_size: (orig_w, orig_h),
    })
}

/// Per-channel scaling the backbone was trained with, mapping `[0, 255]` to
/// `[-1, 1]`. Frozen contract; do not re-derive.
#[inline]
fn scale_pixel(value: f32) -> f32 {
    value / 127.5 - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, Rgba};

    fn gradient_image(width: u32, height: u32) -> DynamicImage {
        let mut img = ImageBuffer::<Rgb<u8>, _>::new(width, height);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            let value = ((x * 7 + y * 13) % 256) as u8;
            *pixel = Rgb([value, value.wrapping_add(40), 255 - value]);
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn produces_batched_nhwc_tensor_in_unit_range() {
        let image = gradient_image(37, 23);
        let config = PreprocessConfig { target_size: 160 };

        let output = preprocess_dynamic_image(&image, &config).expect("preprocess");
        assert_eq!(output.tensor.shape(), &[1, 160, 160, 3]);
        assert_eq!(output.original_size, (37, 23));

        let data = output.tensor.as_slice::<f32>().unwrap();
        assert_eq!(data.len(), 160 * 160 * 3);
        assert!(data.iter().all(|v| *v >= -1.0 && *v <= 1.0));
    }

    #[test]
    fn identical_input_yields_identical_tensor() {
        let image = gradient_image(64, 48);
        let config = PreprocessConfig::default();

        let first = preprocess_dynamic_image(&image, &config).expect("first pass");
        let second = preprocess_dynamic_image(&image, &config).expect("second pass");

        let a = first.tensor.as_slice::<f32>().unwrap();
        let b = second.tensor.as_slice::<f32>().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn target_sized_input_skips_resampling() {
        let image = gradient_image(160, 160);
        let config = PreprocessConfig { target_size: 160 };

        let output = preprocess_dynamic_image(&image, &config).expect("preprocess");
        let data = output.tensor.as_slice::<f32>().unwrap();

        // With no resize involved the tensor is an exact pixel-wise rescale.
        let rgb = image.to_rgb8();
        let pixel = rgb.get_pixel(3, 5);
        let idx = (5 * 160 + 3) * 3;
        assert_eq!(data[idx], pixel[0] as f32 / 127.5 - 1.0);
        assert_eq!(data[idx + 1], pixel[1] as f32 / 127.5 - 1.0);
        assert_eq!(data[idx + 2], pixel[2] as f32 / 127.5 - 1.0);
    }

    #[test]
    fn forces_three_channels_from_rgba() {
        let rgba = ImageBuffer::<Rgba<u8>, _>::from_pixel(160, 160, Rgba([10, 20, 30, 128]));
        let image = DynamicImage::ImageRgba8(rgba);
        let config = PreprocessConfig { target_size: 160 };

        let output = preprocess_dynamic_image(&image, &config).expect("preprocess");
        assert_eq!(output.tensor.shape(), &[1, 160, 160, 3]);
    }

    #[test]
    fn scale_pixel_maps_endpoints() {
        assert_eq!(scale_pixel(0.0), -1.0);
        assert_eq!(scale_pixel(255.0), 1.0);
        assert_eq!(scale_pixel(127.5), 0.0);
    }

    #[test]
    fn rejects_zero_target_size() {
        let image = gradient_image(8, 8);
        let config = PreprocessConfig { target_size: 0 };
        assert!(preprocess_dynamic_image(&image, &config).is_err());
    }

    #[test]
    fn decode_rejects_garbage_bytes() {
        let err = decode_image(b"this is a text file, not an image").expect_err("must fail");
        assert!(matches!(err, ClassifyError::Decode(_)));
    }

    #[test]
    fn decode_rejects_truncated_png() {
        let image = gradient_image(16, 16);
        let mut bytes = Vec::new();
        image
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .expect("encode png");
        bytes.truncate(bytes.len() / 2);

        let err = decode_image(&bytes).expect_err("truncated png must fail");
        assert!(matches!(err, ClassifyError::Decode(_)));
    }
}
