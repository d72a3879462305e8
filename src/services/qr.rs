use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, Luma};
use qrcode::QrCode;
use thiserror::Error;

/// Smallest edge length of a rendered code, in pixels.
const MIN_DIMENSION: u32 = 240;

#[derive(Debug, Error)]
pub enum CodeError {
    #[error("payload could not be encoded: {0}")]
    Encode(String),
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("could not write code image: {0}")]
    Io(#[from] std::io::Error),
    #[error("render task failed: {0}")]
    Task(String),
}

/// A rendered code, written to disk and kept in memory for delivery.
#[derive(Debug, Clone)]
pub struct TicketCode {
    pub file_name: String,
    pub png: Vec<u8>,
}

/// Renders QR codes into a directory, one PNG per ticket.
#[derive(Debug, Clone)]
pub struct CodeRenderer {
    output_dir: PathBuf,
}

impl CodeRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn file_name(ticket_id: i64) -> String {
        format!("{}.png", ticket_id)
    }

    /// JSON text embedded in the code.
    pub fn payload(ticket_id: i64, validation_url: &str) -> String {
        serde_json::json!({
            "ticket_id": ticket_id,
            "validation_url": validation_url,
        })
        .to_string()
    }

    pub fn render_png(text: &str) -> Result<Vec<u8>, CodeError> {
        let code = QrCode::new(text.as_bytes()).map_err(|e| CodeError::Encode(e.to_string()))?;
        let image = code
            .render::<Luma<u8>>()
            .min_dimensions(MIN_DIMENSION, MIN_DIMENSION)
            .build();

        let mut png = Vec::new();
        DynamicImage::ImageLuma8(image).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(png)
    }

    /// Renders and stores the code for `ticket_id` off the async runtime.
    pub async fn generate(
        &self,
        ticket_id: i64,
        validation_url: &str,
    ) -> Result<TicketCode, CodeError> {
        let dir = self.output_dir.clone();
        let payload = Self::payload(ticket_id, validation_url);

        tokio::task::spawn_blocking(move || {
            std::fs::create_dir_all(&dir)?;
            let png = Self::render_png(&payload)?;
            let file_name = Self::file_name(ticket_id);
            std::fs::write(dir.join(&file_name), &png)?;
            Ok::<_, CodeError>(TicketCode { file_name, png })
        })
        .await
        .map_err(|e| CodeError::Task(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G'];

    #[test]
    fn test_payload_contains_id_and_url() {
        let payload = CodeRenderer::payload(7, "https://t.example/scan/7");
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["ticket_id"], 7);
        assert_eq!(value["validation_url"], "https://t.example/scan/7");
    }

    #[test]
    fn test_render_produces_png() {
        let png = CodeRenderer::render_png("hello").unwrap();
        assert!(png.starts_with(PNG_MAGIC));
    }

    #[tokio::test]
    async fn test_generate_writes_file_named_after_ticket() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = CodeRenderer::new(dir.path().join("codes"));

        let code = renderer.generate(12, "http://localhost/scan/12").await.unwrap();
        assert_eq!(code.file_name, "12.png");

        let on_disk = std::fs::read(dir.path().join("codes").join("12.png")).unwrap();
        assert_eq!(on_disk, code.png);
    }

    #[tokio::test]
    async fn test_generate_fails_when_directory_is_unusable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();

        let renderer = CodeRenderer::new(&blocker);
        assert!(matches!(
            renderer.generate(1, "http://localhost/scan/1").await,
            Err(CodeError::Io(_))
        ));
    }
}
