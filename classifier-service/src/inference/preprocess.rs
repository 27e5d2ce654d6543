//! Image decoding and the fixed model input pipeline.

use image::{
    imageops, imageops::FilterType, DynamicImage, ImageError, ImageReader, Limits, RgbImage,
};
use ndarray::Array4;
use std::io::Cursor;

use super::{ImageTensor, InferenceError, IMAGE_SIZE, RGB_CHANNELS};

/// ImageNet per-channel mean, RGB order.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet per-channel standard deviation, RGB order.
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Widest or tallest image the decoder will accept, in pixels.
pub const MAX_IMAGE_DIMENSION: u32 = 8192;

/// Decoder allocation cap; fits one RGBA8 image at the maximum dimensions.
pub const MAX_DECODE_ALLOC: u64 = 256 * 1024 * 1024;

/// Decode an uploaded file, guessing the format from its contents.
///
/// A small compressed upload can declare huge dimensions, so decoding runs
/// under [`MAX_IMAGE_DIMENSION`] and [`MAX_DECODE_ALLOC`].
///
/// # Errors
///
/// Returns [`InferenceError::EmptyUpload`] for a zero-byte upload and
/// [`InferenceError::Decode`] for truncated, oversized or non-image input.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, InferenceError> {
    if bytes.is_empty() {
        return Err(InferenceError::EmptyUpload);
    }

    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| InferenceError::Decode {
            source: ImageError::IoError(e),
        })?;

    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_DIMENSION);
    limits.max_image_height = Some(MAX_IMAGE_DIMENSION);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);
    reader.limits(limits);

    reader
        .decode()
        .map_err(|source| InferenceError::Decode { source })
}

/// Convert an image into the `(1, 3, 112, 112)` normalized NCHW tensor the model expects.
///
/// The image is:
/// 1. Converted to 8-bit RGB
/// 2. Resized to 112x112 with an antialiased bilinear filter
/// 3. Center cropped to 112x112
/// 4. Scaled to [0, 1] and normalized with ImageNet statistics
pub fn preprocess(img: &DynamicImage) -> ImageTensor {
    let resized = img
        .resize_exact(IMAGE_SIZE, IMAGE_SIZE, FilterType::Triangle)
        .to_rgb8();
    let cropped = center_crop(&resized, IMAGE_SIZE);

    let side = IMAGE_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, RGB_CHANNELS, side, side));

    for (x, y, pixel) in cropped.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for c in 0..RGB_CHANNELS {
            let value = f32::from(pixel[c]) / 255.0;
            tensor[[0, c, y, x]] = (value - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }

    tensor
}

/// Take the centered `size` x `size` window. Images smaller than the window
/// are returned unchanged.
fn center_crop(img: &RgbImage, size: u32) -> RgbImage {
    let (width, height) = img.dimensions();
    if width <= size && height <= size {
        return img.clone();
    }

    let crop_w = size.min(width);
    let crop_h = size.min(height);
    let left = (width - crop_w) / 2;
    let top = (height - crop_h) / 2;

    imageops::crop_imm(img, left, top, crop_w, crop_h).to_image()
}
