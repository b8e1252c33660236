use image::DynamicImage;
use image::imageops::FilterType;
use tch::Tensor;

use crate::detect::error::DetectError;

/// Input expectations of one classifier: target size plus per-channel
/// normalization applied after scaling pixels to [0,1].
#[derive(Debug, Clone)]
pub struct TensorSpec {
    pub width: u32,
    pub height: u32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

/// Resize, normalize and lay the image out as a `[1, 3, H, W]` float tensor.
pub fn to_input_tensor(image: &DynamicImage, spec: &TensorSpec) -> Result<Tensor, DetectError> {
    if image.color().channel_count() < 3 {
        return Err(DetectError::Preprocess(format!(
            "expected an RGB image, got {:?}",
            image.color()
        )));
    }

    let resized = image
        .resize_exact(spec.width, spec.height, FilterType::Triangle)
        .to_rgb8();

    let (w, h) = (spec.width as usize, spec.height as usize);
    let mut chw = vec![0f32; 3 * w * h];
    for (x, y, pixel) in resized.enumerate_pixels() {
        let offset = y as usize * w + x as usize;
        for c in 0..3 {
            let scaled = pixel[c] as f32 / 255.0;
            chw[c * w * h + offset] = (scaled - spec.mean[c]) / spec.std[c];
        }
    }

    Ok(Tensor::from_slice(&chw).view([1, 3, h as i64, w as i64]))
}
