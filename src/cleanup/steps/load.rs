use crate::error::SignatureError;
use base64::{engine::general_purpose, Engine as _};
use image::RgbaImage;
use std::path::PathBuf;

/// Where a source image comes from
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Encoded file content (PNG, JPEG, ...)
    Bytes(Vec<u8>),
    /// `data:image/...;base64,` URI or a bare base64 string
    DataUri(String),
    /// Local file
    FilePath(PathBuf),
}

impl ImageSource {
    fn hint(&self) -> &'static str {
        match self {
            Self::Bytes(_) => "bytes",
            Self::DataUri(_) => "data_uri",
            Self::FilePath(_) => "file",
        }
    }
}

/// Decode a source into an RGBA pixel buffer
/// No resizing and no color conversion beyond the decoder's 8-bit sRGB output
pub fn apply(source: ImageSource) -> Result<RgbaImage, SignatureError> {
    let hint = source.hint();
    let bytes = match source {
        ImageSource::Bytes(bytes) => bytes,
        ImageSource::DataUri(uri) => decode_data_uri(&uri)?,
        ImageSource::FilePath(path) => std::fs::read(&path).map_err(|e| {
            SignatureError::DecodeError(format!("Failed to read {}: {}", path.display(), e))
        })?,
    };

    decode(&bytes).inspect(|img| {
        tracing::debug!(
            "Decoded {} source: {}x{}",
            hint,
            img.width(),
            img.height()
        );
    })
}

/// Decode encoded image bytes into RGBA
pub fn decode(bytes: &[u8]) -> Result<RgbaImage, SignatureError> {
    if bytes.is_empty() {
        return Err(SignatureError::DecodeError("Empty image data".to_string()));
    }

    let img = image::load_from_memory(bytes)
        .map_err(|e| SignatureError::DecodeError(e.to_string()))?;
    Ok(img.into_rgba8())
}

fn decode_data_uri(uri: &str) -> Result<Vec<u8>, SignatureError> {
    let normalized = uri.trim();

    let payload = if normalized.starts_with("data:") {
        let start = normalized.find(";base64,").ok_or_else(|| {
            SignatureError::DecodeError("Data URI is not base64 encoded".to_string())
        })?;
        &normalized[start + 8..]
    } else {
        normalized
    };

    general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| SignatureError::DecodeError(format!("Invalid base64 payload: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};
    use std::io::{Cursor, Write};

    fn png_bytes() -> Vec<u8> {
        let mut img = RgbaImage::from_pixel(4, 3, Rgba([250, 250, 250, 255]));
        img.put_pixel(1, 1, Rgba([10, 20, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_load_bytes() {
        let img = apply(ImageSource::Bytes(png_bytes())).unwrap();
        assert_eq!(img.dimensions(), (4, 3));
        assert_eq!(img.get_pixel(1, 1), &Rgba([10, 20, 30, 255]));
        assert_eq!(img.as_raw().len(), 4 * 3 * 4);
    }

    #[test]
    fn test_load_data_uri_and_bare_base64() {
        let encoded = general_purpose::STANDARD.encode(png_bytes());

        let from_uri = apply(ImageSource::DataUri(format!(
            "data:image/png;base64,{}",
            encoded
        )))
        .unwrap();
        let from_bare = apply(ImageSource::DataUri(encoded)).unwrap();

        assert_eq!(from_uri, from_bare);
    }

    #[test]
    fn test_load_file_path() {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(&png_bytes()).unwrap();

        let img = apply(ImageSource::FilePath(file.path().to_path_buf())).unwrap();
        assert_eq!(img.dimensions(), (4, 3));
    }

    #[test]
    fn test_corrupt_input_is_decode_error() {
        let cases = vec![
            ImageSource::Bytes(Vec::new()),
            ImageSource::Bytes(b"definitely not an image".to_vec()),
            ImageSource::DataUri("data:image/png,plain".to_string()),
            ImageSource::DataUri("data:image/png;base64,@@@".to_string()),
            ImageSource::FilePath(PathBuf::from("/nonexistent/signature.png")),
        ];

        for source in cases {
            assert!(matches!(apply(source), Err(SignatureError::DecodeError(_))));
        }
    }

    #[test]
    fn test_truncated_png_is_decode_error() {
        let mut bytes = png_bytes();
        bytes.truncate(bytes.len() / 2);
        assert!(matches!(decode(&bytes), Err(SignatureError::DecodeError(_))));
    }
}
