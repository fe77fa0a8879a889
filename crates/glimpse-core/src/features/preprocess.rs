//! Image preprocessing for the backbone.
//!
//! The captioning backbone expects:
//! - Input size: `image_size × image_size` pixels (224 by default)
//! - Normalization: pixels scaled to [0, 1] via pixel / 255
//! - Channel order: RGB
//! - Tensor layout: NHWC for Keras exports, NCHW for PyTorch exports

use image::DynamicImage;
use ndarray::Array4;

use crate::config::TensorLayout;

/// Number of color channels (RGB).
pub(crate) const CHANNELS: usize = 3;

/// Preprocess an image for backbone inference.
///
/// Resizes to `image_size × image_size` ignoring aspect ratio, converts to
/// RGB, scales to [0, 1] and returns a batch-of-one tensor in `layout`.
pub fn preprocess(image: &DynamicImage, image_size: u32, layout: TensorLayout) -> Array4<f32> {
    let resized = image.resize_exact(
        image_size,
        image_size,
        image::imageops::FilterType::CatmullRom,
    );
    let rgb = resized.to_rgb8();

    let size = image_size as usize;
    let mut tensor = match layout {
        TensorLayout::Nhwc => Array4::<f32>::zeros((1, size, size, CHANNELS)),
        TensorLayout::Nchw => Array4::<f32>::zeros((1, CHANNELS, size, size)),
    };

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for (c, &val) in pixel.0.iter().enumerate() {
            let scaled = val as f32 / 255.0;
            match layout {
                TensorLayout::Nhwc => tensor[[0, y, x, c]] = scaled,
                TensorLayout::Nchw => tensor[[0, c, y, x]] = scaled,
            }
        }
    }

    tensor
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage, RgbaImage};

    #[test]
    fn test_preprocess_shape_nhwc() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(640, 480));
        let tensor = preprocess(&img, 224, TensorLayout::Nhwc);
        assert_eq!(tensor.shape(), &[1, 224, 224, 3]);
    }

    #[test]
    fn test_preprocess_shape_nchw() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(640, 480));
        let tensor = preprocess(&img, 299, TensorLayout::Nchw);
        assert_eq!(tensor.shape(), &[1, 3, 299, 299]);
    }

    #[test]
    fn test_preprocess_unit_range() {
        let white = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, Rgb([255, 255, 255])));
        let tensor = preprocess(&white, 32, TensorLayout::Nhwc);
        assert!(tensor.iter().all(|&v| (v - 1.0).abs() < 1e-6));

        let black = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, Rgb([0, 0, 0])));
        let tensor = preprocess(&black, 32, TensorLayout::Nhwc);
        assert!(tensor.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_channel_placement_per_layout() {
        let red = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([255, 0, 0])));

        let nhwc = preprocess(&red, 4, TensorLayout::Nhwc);
        assert_eq!(nhwc[[0, 2, 1, 0]], 1.0);
        assert_eq!(nhwc[[0, 2, 1, 1]], 0.0);

        let nchw = preprocess(&red, 4, TensorLayout::Nchw);
        assert_eq!(nchw[[0, 0, 2, 1]], 1.0);
        assert_eq!(nchw[[0, 2, 2, 1]], 0.0);
    }

    #[test]
    fn test_alpha_channel_dropped() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::new(8, 8));
        let tensor = preprocess(&rgba, 8, TensorLayout::Nhwc);
        assert_eq!(tensor.shape()[3], CHANNELS);
    }

    #[test]
    fn test_grayscale_expanded_to_rgb() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(6, 6, Luma([255])));
        let tensor = preprocess(&gray, 6, TensorLayout::Nchw);
        assert_eq!(tensor.shape(), &[1, CHANNELS, 6, 6]);
        assert!(tensor.iter().all(|&v| (v - 1.0).abs() < 1e-6));
    }
}
