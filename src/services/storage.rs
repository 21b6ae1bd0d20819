// SPDX-License-Identifier: MIT

//! Blob storage service (Google Cloud Storage).
//!
//! Validates uploads (size, format, image dimensions) before sending bytes
//! to the bucket, and returns a publicly resolvable URL.

use crate::error::AppError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::time::Duration;

/// Outbound request timeout (seconds).
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum accepted URL length when a picture is passed by reference.
const MAX_URL_LENGTH: usize = 2048;

const IMAGE_MAX_SIZE: usize = 5 * 1024 * 1024;
const DOCUMENT_MAX_SIZE: usize = 10 * 1024 * 1024;
const VIDEO_MAX_SIZE: usize = 50 * 1024 * 1024;

const IMAGE_MAX_DIMENSION: u32 = 2048;
const IMAGE_MIN_DIMENSION: u32 = 50;

const DOCUMENT_FORMATS: [&str; 5] = ["PDF", "DOC", "DOCX", "TXT", "RTF"];
const VIDEO_FORMATS: [&str; 4] = ["MP4", "MOV", "AVI", "WEBM"];

/// Cloud Storage client.
#[derive(Clone)]
pub struct StorageService {
    /// None in offline/mock mode: uploads succeed without network.
    http: Option<reqwest::Client>,
    base_url: String,
    bucket: String,
    access_token: Option<String>,
}

impl StorageService {
    /// Create a new storage client for a bucket.
    ///
    /// Honors `STORAGE_EMULATOR_HOST` for local development.
    pub fn new(bucket: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        let base_url = std::env::var("STORAGE_EMULATOR_HOST")
            .map(|host| format!("http://{}", host.trim_start_matches("http://")))
            .unwrap_or_else(|_| "https://storage.googleapis.com".to_string());

        Ok(Self {
            http: Some(http),
            base_url,
            bucket: bucket.to_string(),
            access_token: std::env::var("GOOGLE_ACCESS_TOKEN").ok(),
        })
    }

    /// Create a mock storage client for testing (offline mode).
    ///
    /// Uploads are validated and a deterministic public URL is returned
    /// without any network call.
    pub fn new_mock(bucket: &str) -> Self {
        Self {
            http: None,
            base_url: "https://storage.googleapis.com".to_string(),
            bucket: bucket.to_string(),
            access_token: None,
        }
    }

    // ─── Validation ──────────────────────────────────────────────

    /// Validate an image provided as base64 data or URL.
    pub fn validate_image(&self, image_data: &str) -> Result<(), String> {
        if is_url(image_data) {
            if image_data.len() > MAX_URL_LENGTH {
                return Err("URL is too long".to_string());
            }
            return Ok(());
        }

        let decoded = decode_base64_payload(image_data).map_err(|_| "Invalid image data")?;

        if decoded.len() > IMAGE_MAX_SIZE {
            return Err(format!(
                "Image size exceeds {}MB limit",
                IMAGE_MAX_SIZE / 1024 / 1024
            ));
        }

        let format = image::guess_format(&decoded)
            .map_err(|_| "Invalid image format or corrupted data".to_string())?;
        if !matches!(
            format,
            image::ImageFormat::Jpeg
                | image::ImageFormat::Png
                | image::ImageFormat::Gif
                | image::ImageFormat::WebP
        ) {
            return Err("Invalid image format. Allowed formats: JPEG, PNG, GIF, WEBP".to_string());
        }

        let img = image::load_from_memory(&decoded)
            .map_err(|_| "Invalid image format or corrupted data".to_string())?;

        use image::GenericImageView;
        let (width, height) = img.dimensions();
        if width > IMAGE_MAX_DIMENSION || height > IMAGE_MAX_DIMENSION {
            return Err(format!(
                "Image dimensions exceed {}x{} pixels",
                IMAGE_MAX_DIMENSION, IMAGE_MAX_DIMENSION
            ));
        }
        if width < IMAGE_MIN_DIMENSION || height < IMAGE_MIN_DIMENSION {
            return Err(format!(
                "Image dimensions must be at least {}x{} pixels",
                IMAGE_MIN_DIMENSION, IMAGE_MIN_DIMENSION
            ));
        }

        Ok(())
    }

    /// Validate a base64 document by extension and size.
    pub fn validate_document(&self, file_data: &str, file_extension: &str) -> Result<(), String> {
        validate_by_extension(
            file_data,
            file_extension,
            &DOCUMENT_FORMATS,
            DOCUMENT_MAX_SIZE,
            "document",
        )
    }

    /// Validate a base64 video by extension and size.
    pub fn validate_video(&self, file_data: &str, file_extension: &str) -> Result<(), String> {
        validate_by_extension(
            file_data,
            file_extension,
            &VIDEO_FORMATS,
            VIDEO_MAX_SIZE,
            "video",
        )
    }

    // ─── Upload ──────────────────────────────────────────────────

    /// Upload base64 file data and return the public URL.
    ///
    /// Data already in URL form passes through unchanged.
    pub async fn upload(
        &self,
        file_data: &str,
        file_name: &str,
        folder_path: &str,
    ) -> Result<String, AppError> {
        if is_url(file_data) {
            return Ok(file_data.to_string());
        }

        let bytes = decode_base64_payload(file_data)
            .map_err(|e| AppError::Storage(format!("Invalid base64 payload: {}", e)))?;

        let object_path = format!(
            "{}/{}_{}",
            folder_path,
            uuid::Uuid::new_v4(),
            file_name
        );
        let public_url = format!(
            "https://storage.googleapis.com/{}/{}",
            self.bucket, object_path
        );

        let Some(http) = &self.http else {
            // Offline mode: pretend the upload succeeded.
            return Ok(public_url);
        };

        let url = format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.base_url,
            self.bucket,
            urlencoding::encode(&object_path)
        );

        let mut request = http
            .post(&url)
            .header("Content-Type", content_type_for(file_name))
            .body(bytes);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Upload request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Storage(format!(
                "Upload failed with {}: {}",
                status, text
            )));
        }

        tracing::info!(object = %object_path, "File uploaded to storage");
        Ok(public_url)
    }
}

/// Whether a payload is a URL rather than encoded bytes.
pub fn is_url(data: &str) -> bool {
    data.starts_with("http://") || data.starts_with("https://")
}

/// Decode a base64 payload, tolerating a `data:` URI prefix.
fn decode_base64_payload(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let encoded = match data.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, b)| b).unwrap_or(rest),
        None => data,
    };
    BASE64.decode(encoded.trim())
}

fn validate_by_extension(
    file_data: &str,
    file_extension: &str,
    formats: &[&str],
    max_size: usize,
    kind: &str,
) -> Result<(), String> {
    let ext = file_extension.trim_start_matches('.').to_uppercase();
    if !formats.contains(&ext.as_str()) {
        return Err(format!(
            "Invalid {} format. Allowed formats: {}",
            kind,
            formats.join(", ")
        ));
    }

    let decoded = decode_base64_payload(file_data).map_err(|_| format!("Invalid {} data", kind))?;
    if decoded.len() > max_size {
        return Err(format!(
            "{} size exceeds {}MB limit",
            capitalize(kind),
            max_size / 1024 / 1024
        ));
    }

    Ok(())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// MIME content type from a file name's extension.
fn content_type_for(file_name: &str) -> &'static str {
    let extension = file_name.rsplit('.').next().unwrap_or("").to_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        "rtf" => "application/rtf",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;
    use std::io::Cursor;

    fn png_base64(width: u32, height: u32) -> String {
        let img = image::DynamicImage::new_rgb8(width, height);
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        BASE64.encode(&buffer)
    }

    #[test]
    fn test_validate_image_accepts_valid_png() {
        let service = StorageService::new_mock("test-bucket");
        assert!(service.validate_image(&png_base64(100, 100)).is_ok());
    }

    #[test]
    fn test_validate_image_accepts_data_uri() {
        let service = StorageService::new_mock("test-bucket");
        let data = format!("data:image/png;base64,{}", png_base64(100, 100));
        assert!(service.validate_image(&data).is_ok());
    }

    #[test]
    fn test_validate_image_rejects_small_dimensions() {
        let service = StorageService::new_mock("test-bucket");
        let err = service.validate_image(&png_base64(20, 20)).unwrap_err();
        assert!(err.contains("at least 50x50"));
    }

    #[test]
    fn test_validate_image_rejects_large_dimensions() {
        let service = StorageService::new_mock("test-bucket");
        let err = service.validate_image(&png_base64(3000, 100)).unwrap_err();
        assert!(err.contains("exceed 2048x2048"));
    }

    #[test]
    fn test_validate_image_rejects_garbage() {
        let service = StorageService::new_mock("test-bucket");
        assert!(service.validate_image("!!!not-base64!!!").is_err());
        let garbage = BASE64.encode(b"not an image at all");
        assert!(service.validate_image(&garbage).is_err());
    }

    #[test]
    fn test_validate_image_passes_urls_with_length_cap() {
        let service = StorageService::new_mock("test-bucket");
        assert!(service.validate_image("https://cdn.example/p.jpg").is_ok());
        let long = format!("https://cdn.example/{}", "a".repeat(3000));
        assert!(service.validate_image(&long).is_err());
    }

    #[test]
    fn test_validate_document_by_extension() {
        let service = StorageService::new_mock("test-bucket");
        let data = BASE64.encode(b"%PDF-1.4 fake");
        assert!(service.validate_document(&data, "pdf").is_ok());
        assert!(service.validate_document(&data, ".PDF").is_ok());
        assert!(service.validate_document(&data, "exe").is_err());
    }

    #[test]
    fn test_validate_video_size_limit() {
        let service = StorageService::new_mock("test-bucket");
        let small = BASE64.encode(b"tiny");
        assert!(service.validate_video(&small, "mp4").is_ok());
        assert!(service.validate_video(&small, "mkv").is_err());
    }

    #[tokio::test]
    async fn test_mock_upload_returns_public_url() {
        let service = StorageService::new_mock("test-bucket");
        let url = service
            .upload(&png_base64(64, 64), "photo.png", "profile_photos")
            .await
            .unwrap();
        assert!(url.starts_with("https://storage.googleapis.com/test-bucket/profile_photos/"));
        assert!(url.ends_with("_photo.png"));
    }

    #[tokio::test]
    async fn test_upload_passes_urls_through() {
        let service = StorageService::new_mock("test-bucket");
        let url = service
            .upload("https://cdn.example/p.jpg", "ignored.jpg", "profile_photos")
            .await
            .unwrap();
        assert_eq!(url, "https://cdn.example/p.jpg");
    }

    #[test]
    fn test_content_type_mapping() {
        assert_eq!(content_type_for("a.jpg"), "image/jpeg");
        assert_eq!(content_type_for("a.webm"), "video/webm");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }
}
