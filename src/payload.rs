use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use regex::Regex;
use std::path::Path;

use crate::config::ImageConfig;

/// Media type every payload is declared as when submitted to the model.
pub const SUBMISSION_MIME_TYPE: &str = "image/jpeg";

lazy_static::lazy_static! {
    static ref DATA_URL_RE: Regex =
        Regex::new(r"(?i)\Adata:(image/[a-z0-9.+-]+);base64,").unwrap();
}

/// Strip a `data:image/<subtype>;base64,` envelope, if present.
///
/// Returns the input unchanged when it carries no envelope.
///
/// ```rust
/// use image_analyzer::payload::strip_data_url;
///
/// assert_eq!(strip_data_url("data:image/png;base64,iVBORw0KGgo="), "iVBORw0KGgo=");
/// assert_eq!(strip_data_url("iVBORw0KGgo="), "iVBORw0KGgo=");
/// ```
pub fn strip_data_url(input: &str) -> &str {
    match DATA_URL_RE.find(input) {
        Some(m) => &input[m.end()..],
        None => input,
    }
}

/// The media type declared inside a data-URL envelope.
pub fn data_url_mime_type(input: &str) -> Option<&str> {
    DATA_URL_RE
        .captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// A base64-encoded image together with its declared media type.
///
/// Lives only for the duration of one analysis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    data: String,
    mime_type: String,
}

impl ImagePayload {
    /// Encode raw image bytes.
    pub fn from_bytes(bytes: &[u8], mime_type: &str) -> Self {
        Self {
            data: base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes),
            mime_type: mime_type.to_string(),
        }
    }

    /// Accept a data URL (`data:image/webp;base64,...`) or a bare base64 string.
    pub fn from_data_url(input: &str) -> Result<Self> {
        let input = input.trim();
        let mime_type = data_url_mime_type(input)
            .map(|m| m.to_ascii_lowercase())
            .unwrap_or_else(|| SUBMISSION_MIME_TYPE.to_string());
        let data = strip_data_url(input).trim();
        if data.is_empty() {
            anyhow::bail!("Image payload is empty");
        }
        Ok(Self {
            data: data.to_string(),
            mime_type,
        })
    }

    /// Read an image file from disk.
    ///
    /// The format is sniffed from the file contents. Non-JPEG images are
    /// re-encoded as JPEG when `transcode_to_jpeg` is set, so the payload
    /// matches [`SUBMISSION_MIME_TYPE`].
    pub fn load(path: &Path, config: &ImageConfig) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read image file {}", path.display()))?;

        if bytes.len() as u64 > config.max_bytes {
            anyhow::bail!(
                "{} is {} bytes, larger than the {} byte limit",
                path.display(),
                bytes.len(),
                config.max_bytes
            );
        }

        let format = image::guess_format(&bytes)
            .with_context(|| format!("Unrecognized image format: {}", path.display()))?;

        if format == ImageFormat::Jpeg || !config.transcode_to_jpeg {
            return Ok(Self::from_bytes(&bytes, format.to_mime_type()));
        }

        log::debug!(
            "Transcoding {} ({:?}) to JPEG at quality {}",
            path.display(),
            format,
            config.jpeg_quality
        );
        let jpeg = transcode_to_jpeg(&bytes, format, config.jpeg_quality)?;
        Ok(Self::from_bytes(&jpeg, SUBMISSION_MIME_TYPE))
    }

    /// The unwrapped base64 payload.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// The media type the payload was declared with.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

fn transcode_to_jpeg(bytes: &[u8], format: ImageFormat, quality: u8) -> Result<Vec<u8>> {
    let img = image::load_from_memory_with_format(bytes, format)
        .context("Failed to decode image")?;

    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut jpeg = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100)))
        .context("Failed to encode JPEG")?;
    Ok(jpeg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::fs;
    use tempfile::TempDir;

    fn png_bytes() -> Vec<u8> {
        let img = RgbaImage::from_pixel(4, 4, Rgba([200, 30, 30, 128]));
        let mut buf = std::io::Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    // ── strip_data_url ───────────────────────────────────────────────

    #[test]
    fn strip_envelope_for_common_subtypes() {
        let bare = "/9j/4AAQSkZJRg==";
        for subtype in ["png", "jpeg", "jpg", "webp", "gif", "svg+xml"] {
            let wrapped = format!("data:image/{subtype};base64,{bare}");
            assert_eq!(strip_data_url(&wrapped), strip_data_url(bare), "subtype {subtype}");
        }
    }

    #[test]
    fn strip_envelope_is_case_insensitive() {
        assert_eq!(strip_data_url("DATA:image/PNG;base64,abc="), "abc=");
    }

    #[test]
    fn strip_leaves_bare_input_untouched() {
        assert_eq!(strip_data_url("abc="), "abc=");
        assert_eq!(strip_data_url(""), "");
    }

    #[test]
    fn strip_ignores_non_image_envelopes() {
        let text = "data:text/plain;base64,aGVsbG8=";
        assert_eq!(strip_data_url(text), text);
    }

    #[test]
    fn strip_only_at_start() {
        let text = "xx data:image/png;base64,abc";
        assert_eq!(strip_data_url(text), text);
    }

    // ── data_url_mime_type ───────────────────────────────────────────

    #[test]
    fn mime_type_from_envelope() {
        assert_eq!(data_url_mime_type("data:image/webp;base64,UklGR"), Some("image/webp"));
        assert_eq!(data_url_mime_type("UklGR"), None);
    }

    // ── ImagePayload ─────────────────────────────────────────────────

    #[test]
    fn from_data_url_keeps_declared_type() {
        let payload = ImagePayload::from_data_url("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(payload.data(), "iVBORw0KGgo=");
        assert_eq!(payload.mime_type(), "image/png");
    }

    #[test]
    fn from_data_url_accepts_bare_base64() {
        let payload = ImagePayload::from_data_url("  iVBORw0KGgo=\n").unwrap();
        assert_eq!(payload.data(), "iVBORw0KGgo=");
        assert_eq!(payload.mime_type(), SUBMISSION_MIME_TYPE);
    }

    #[test]
    fn from_data_url_rejects_empty() {
        assert!(ImagePayload::from_data_url("").is_err());
        assert!(ImagePayload::from_data_url("data:image/png;base64,").is_err());
    }

    #[test]
    fn from_bytes_encodes_base64() {
        let payload = ImagePayload::from_bytes(b"hello", "image/jpeg");
        assert_eq!(payload.data(), "aGVsbG8=");
        assert_eq!(payload.mime_type(), "image/jpeg");
    }

    // ── ImagePayload::load ───────────────────────────────────────────

    #[test]
    fn load_transcodes_png_to_jpeg() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("red.png");
        fs::write(&path, png_bytes()).unwrap();

        let payload = ImagePayload::load(&path, &ImageConfig::default()).unwrap();
        assert_eq!(payload.mime_type(), "image/jpeg");

        let decoded =
            base64::Engine::decode(&base64::engine::general_purpose::STANDARD, payload.data())
                .unwrap();
        assert_eq!(image::guess_format(&decoded).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn load_without_transcoding_keeps_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("red.png");
        let bytes = png_bytes();
        fs::write(&path, &bytes).unwrap();

        let config = ImageConfig {
            transcode_to_jpeg: false,
            ..ImageConfig::default()
        };
        let payload = ImagePayload::load(&path, &config).unwrap();
        assert_eq!(payload.mime_type(), "image/png");
        assert_eq!(payload, ImagePayload::from_bytes(&bytes, "image/png"));
    }

    #[test]
    fn load_rejects_oversized_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.png");
        fs::write(&path, png_bytes()).unwrap();

        let config = ImageConfig {
            max_bytes: 8,
            ..ImageConfig::default()
        };
        assert!(ImagePayload::load(&path, &config).is_err());
    }

    #[test]
    fn load_rejects_non_images() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.jpg");
        fs::write(&path, b"definitely not an image").unwrap();
        assert!(ImagePayload::load(&path, &ImageConfig::default()).is_err());
    }

    #[test]
    fn load_missing_file_fails() {
        let result = ImagePayload::load(Path::new("/nonexistent/photo.jpg"), &ImageConfig::default());
        assert!(result.is_err());
    }
}
