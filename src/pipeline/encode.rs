//! Image encoding: raw upload bytes → base64 `ImageData`.
//!
//! VLM APIs accept images as base64 data-URIs embedded in the JSON request
//! body. The bytes are forwarded untouched: no decoding, resizing or
//! re-compression happens here.

use crate::config::ImageDetail;
use crate::pipeline::input::ImageUpload;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::ImageFormat;
use tracing::debug;

/// MIME type used when neither the bytes nor the client say what they are.
pub const FALLBACK_MIME: &str = "image/jpeg";

/// Standard (padded, RFC 4648) base64 of arbitrary bytes. Never fails.
pub fn encode_image(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Pick the MIME type for the data URI.
///
/// Magic bytes win over the client's claim; a declared `image/*` type is the
/// second choice, then [`FALLBACK_MIME`]. Nothing is rejected.
pub fn detect_mime_type(bytes: &[u8], declared: Option<&str>) -> &'static str {
    if let Ok(format) = image::guess_format(bytes) {
        match format {
            ImageFormat::Png => return "image/png",
            ImageFormat::Jpeg => return "image/jpeg",
            ImageFormat::Gif => return "image/gif",
            ImageFormat::WebP => return "image/webp",
            _ => {}
        }
    }

    match declared.map(|d| d.trim().to_ascii_lowercase()).as_deref() {
        Some("image/png") => "image/png",
        Some("image/jpeg") | Some("image/jpg") => "image/jpeg",
        Some("image/gif") => "image/gif",
        Some("image/webp") => "image/webp",
        _ => FALLBACK_MIME,
    }
}

/// `data:<mime>;base64,<payload>`
pub fn data_uri(mime_type: &str, b64: &str) -> String {
    format!("data:{mime_type};base64,{b64}")
}

/// Wrap an upload as a provider attachment.
pub fn to_image_data(upload: &ImageUpload, detail: ImageDetail) -> ImageData {
    let mime = detect_mime_type(&upload.bytes, upload.content_type.as_deref());
    let b64 = encode_image(&upload.bytes);
    debug!(
        "Encoded {} bytes of {} → {} bytes base64",
        upload.bytes.len(),
        mime,
        b64.len()
    );

    let data = ImageData::new(b64, mime);
    match detail.as_hint() {
        Some(hint) => data.with_detail(hint),
        None => data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::io::Cursor;

    fn jpeg_bytes() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([200, 200, 200])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
            .expect("jpeg encode");
        buf
    }

    #[test]
    fn round_trips_arbitrary_bytes() {
        let samples: [&[u8]; 4] = [b"", b"\x00", b"\xff\xfe\xfd", b"engineering drawing"];
        for bytes in samples {
            let decoded = STANDARD.decode(encode_image(bytes)).expect("valid base64");
            assert_eq!(decoded, bytes);
        }
    }

    #[test]
    fn empty_input_encodes_to_empty_string() {
        assert_eq!(encode_image(b""), "");
    }

    #[test]
    fn uses_standard_alphabet_with_padding() {
        assert_eq!(encode_image(b"\xfb\xff"), "+/8=");
    }

    #[test]
    fn sniffs_jpeg_and_png() {
        assert_eq!(detect_mime_type(&jpeg_bytes(), None), "image/jpeg");
        assert_eq!(
            detect_mime_type(b"\x89PNG\r\n\x1a\n0000", Some("image/jpeg")),
            "image/png"
        );
    }

    #[test]
    fn falls_back_to_declared_then_jpeg() {
        assert_eq!(detect_mime_type(b"????", Some("IMAGE/PNG")), "image/png");
        assert_eq!(detect_mime_type(b"????", Some("application/pdf")), FALLBACK_MIME);
        assert_eq!(detect_mime_type(b"", None), FALLBACK_MIME);
    }

    #[test]
    fn data_uri_format() {
        assert_eq!(data_uri("image/png", "AAAA"), "data:image/png;base64,AAAA");
    }

    #[test]
    fn image_data_carries_mime_and_payload() {
        let upload = ImageUpload::new(jpeg_bytes());
        let data = to_image_data(&upload, ImageDetail::Auto);
        assert_eq!(data.mime_type, "image/jpeg");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(decoded, upload.bytes);
    }
}
