use base64::Engine as _;
use image::{DynamicImage, ImageFormat, RgbImage, codecs::jpeg::JpegEncoder, imageops::FilterType};

use crate::{
    assets::RasterImage,
    foundation::error::{FetchError, ReportError, ReportResult},
};

/// Upload limit for images stored inline in the configuration.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, FetchError> {
    image::load_from_memory(bytes).map_err(|e| FetchError::decode(e.to_string()))
}

/// Decode `bytes`, resample to exactly `width`x`height` and re-encode as JPEG.
///
/// Aspect ratio is not preserved; the image fills the inset.
pub fn reencode_inset(
    bytes: &[u8],
    width: u32,
    height: u32,
    quality: u8,
) -> Result<RasterImage, FetchError> {
    let img = decode_image(bytes)?;
    let resized = img.resize_exact(width, height, FilterType::Triangle);
    let rgb = flatten_to_rgb(&resized);
    let jpeg = encode_jpeg(&rgb, quality).map_err(|e| FetchError::decode(e.to_string()))?;
    Ok(RasterImage::new(width, height, jpeg))
}

pub fn encode_jpeg(rgb: &RgbImage, quality: u8) -> image::ImageResult<Vec<u8>> {
    let mut out = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))?;
    Ok(out)
}

/// Composite straight-alpha pixels over white.
fn flatten_to_rgb(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    let mut rgb = RgbImage::new(w, h);
    for (dst, src) in rgb.pixels_mut().zip(rgba.pixels()) {
        let a = u16::from(src[3]);
        for c in 0..3 {
            let v = u16::from(src[c]) * a + 255 * (255 - a);
            dst[c] = ((v + 127) / 255) as u8;
        }
    }
    rgb
}

/// Composite premultiplied RGBA8 pixels over an opaque `background`.
pub fn premul_rgba_to_rgb(width: u32, height: u32, premul: &[u8], background: [u8; 3]) -> RgbImage {
    let mut rgb = RgbImage::new(width, height);
    for (dst, px) in rgb.pixels_mut().zip(premul.chunks_exact(4)) {
        let inv_a = 255 - u32::from(px[3]);
        for c in 0..3 {
            let v = u32::from(px[c]) * 255 + u32::from(background[c]) * inv_a;
            dst[c] = ((v + 127) / 255).min(255) as u8;
        }
    }
    rgb
}

/// Validate an uploaded image and wrap it as a `data:` URI.
///
/// Only JPEG, PNG, GIF and WebP are accepted, detected from the content, up to
/// [`MAX_UPLOAD_BYTES`].
pub fn image_data_uri(bytes: &[u8]) -> ReportResult<String> {
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ReportError::validation(format!(
            "image is {} bytes, maximum is {} MiB",
            bytes.len(),
            MAX_UPLOAD_BYTES / (1024 * 1024)
        )));
    }
    let format = image::guess_format(bytes)
        .map_err(|_| ReportError::validation("file is not a recognized image"))?;
    let mime = match format {
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Png => "image/png",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        other => {
            return Err(ReportError::validation(format!(
                "image type {other:?} not allowed; accepted: jpeg, png, gif, webp"
            )));
        }
    };
    let payload = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(format!("data:{mime};base64,{payload}"))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::assets::fetch::decode_data_uri;

    fn png_bytes(w: u32, h: u32, rgba: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba(rgba));
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn inset_is_resampled_to_exact_size() {
        let src = png_bytes(7, 3, [10, 200, 30, 255]);
        let raster = reencode_inset(&src, 160, 120, 80).unwrap();
        assert_eq!((raster.width, raster.height), (160, 120));

        let back = image::load_from_memory(&raster.jpeg).unwrap();
        assert_eq!((back.width(), back.height()), (160, 120));
        assert_eq!(image::guess_format(&raster.jpeg).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = reencode_inset(b"definitely not an image", 10, 10, 80).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn transparent_pixels_flatten_to_white() {
        let img = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            1,
            1,
            image::Rgba([0, 0, 0, 0]),
        ));
        assert_eq!(flatten_to_rgb(&img).get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn premultiplied_half_alpha_over_black() {
        // 50% white, premultiplied
        let rgb = premul_rgba_to_rgb(1, 1, &[128, 128, 128, 128], [0, 0, 0]);
        assert_eq!(rgb.get_pixel(0, 0).0, [128, 128, 128]);
        let rgb = premul_rgba_to_rgb(1, 1, &[0, 0, 0, 0], [41, 128, 185]);
        assert_eq!(rgb.get_pixel(0, 0).0, [41, 128, 185]);
    }

    #[test]
    fn upload_becomes_data_uri() {
        let png = png_bytes(2, 2, [1, 2, 3, 255]);
        let uri = image_data_uri(&png).unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
        assert_eq!(decode_data_uri(&uri).unwrap(), png);
    }

    #[test]
    fn upload_rejects_non_images_and_oversize() {
        assert!(matches!(
            image_data_uri(b"plain text"),
            Err(ReportError::Validation(_))
        ));

        let mut big = png_bytes(1, 1, [0, 0, 0, 255]);
        big.resize(MAX_UPLOAD_BYTES + 1, 0);
        assert!(matches!(
            image_data_uri(&big),
            Err(ReportError::Validation(_))
        ));
    }
}
