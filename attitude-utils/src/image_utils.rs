use std::path::Path;

use anyhow::{Context, Result};
use image::{DynamicImage, RgbImage, imageops::FilterType};
use ndarray::Array3;

/// Load an image from disk into memory.
///
/// # Arguments
///
/// * `path` - The path to the image file.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
    let path_ref = path.as_ref();
    image::open(path_ref).with_context(|| format!("failed to open image {}", path_ref.display()))
}

/// Resize an image to the requested resolution using the provided filter.
///
/// The output is always 3-channel RGB regardless of the source color type.
///
/// # Arguments
///
/// * `image` - The image to resize.
/// * `width` - The target width.
/// * `height` - The target height.
/// * `filter` - The sampling filter to use for resizing.
pub fn resize_image(image: &DynamicImage, width: u32, height: u32, filter: FilterType) -> RgbImage {
    image.resize_exact(width, height, filter).to_rgb8()
}

/// Convert an RGB image into an HWC float array with raw channel values.
///
/// The memory layout is (height, width, channels) in RGB order, matching the
/// layout Keras-trained backbones consume. Values are the raw `0..=255` pixel
/// values converted to `f32`; any further scaling is the caller's concern.
///
/// # Arguments
///
/// * `image` - The RGB image to convert.
pub fn rgb_to_hwc_array(image: &RgbImage) -> Array3<f32> {
    let (width, height) = image.dimensions();
    let mut array = Array3::<f32>::zeros((height as usize, width as usize, 3));
    for (x, y, pixel) in image.enumerate_pixels() {
        let (xi, yi) = (x as usize, y as usize);
        array[(yi, xi, 0)] = pixel[0] as f32;
        array[(yi, xi, 1)] = pixel[1] as f32;
        array[(yi, xi, 2)] = pixel[2] as f32;
    }
    array
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_to_hwc_array_preserves_channel_order() {
        let mut image = RgbImage::new(2, 2);
        image.put_pixel(0, 0, image::Rgb([0, 128, 255]));
        image.put_pixel(1, 0, image::Rgb([255, 128, 0]));
        image.put_pixel(0, 1, image::Rgb([64, 64, 64]));
        image.put_pixel(1, 1, image::Rgb([255, 255, 255]));

        let array = rgb_to_hwc_array(&image);
        assert_eq!(array.shape(), &[2, 2, 3]);

        assert_eq!(array[(0, 0, 0)], 0.0);
        assert_eq!(array[(0, 0, 1)], 128.0);
        assert_eq!(array[(0, 0, 2)], 255.0);
        assert_eq!(array[(0, 1, 0)], 255.0);
        assert_eq!(array[(1, 0, 0)], 64.0);
    }

    #[test]
    fn resize_image_forces_rgb_output() {
        let rgba = image::RgbaImage::from_pixel(8, 6, image::Rgba([10, 20, 30, 255]));
        let dynamic = DynamicImage::ImageRgba8(rgba);

        let resized = resize_image(&dynamic, 4, 4, FilterType::CatmullRom);
        assert_eq!(resized.dimensions(), (4, 4));
    }

    #[test]
    fn load_image_reports_missing_file() {
        let err = load_image("does-not-exist.png").expect_err("missing file should fail");
        assert!(format!("{err:#}").contains("does-not-exist.png"));
    }
}
