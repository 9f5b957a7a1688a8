use anyhow::{Context, Result, bail};
use std::fs;
use std::io::{self, Read};

use crate::item::{CapturedContent, ItemType};
use crate::orchestrator::image_dimensions;

const MAX_INPUT_SIZE: usize = 1024 * 1024; // 1MB
const MAX_IMAGE_SIZE: usize = 16 * 1024 * 1024;

/// Turns a file or stdin into a capture, as the clipboard watcher would.
pub struct InputReader;

impl InputReader {
    pub fn read(file_path: Option<&str>) -> Result<CapturedContent> {
        let (bytes, source) = match file_path {
            Some(path) => (Self::read_file(path)?, path.to_string()),
            None => (Self::read_stdin()?, "stdin".to_string()),
        };
        Self::classify(bytes).map(|captured| captured.with_source_app(source))
    }

    /// Images by content sniffing, links for a single URL, text otherwise.
    pub fn classify(bytes: Vec<u8>) -> Result<CapturedContent> {
        if let Some((width, height)) = image_dimensions(&bytes) {
            return Ok(CapturedContent::image(bytes, format!("Image {width}×{height}")));
        }

        check_size(bytes.len(), MAX_INPUT_SIZE)?;
        let text = String::from_utf8(bytes).context("Input is not valid UTF-8")?;
        let mut captured = CapturedContent::text(text);
        if is_link(&captured.content) {
            captured.item_type = ItemType::Link;
        }
        Ok(captured)
    }

    fn read_file(path: &str) -> Result<Vec<u8>> {
        let metadata =
            fs::metadata(path).with_context(|| format!("Failed to access file: {path}"))?;
        check_size(usize::try_from(metadata.len()).unwrap_or(usize::MAX), MAX_IMAGE_SIZE)?;
        fs::read(path).with_context(|| format!("Failed to read file: {path}"))
    }

    #[allow(clippy::significant_drop_tightening)]
    fn read_stdin() -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 8192];
        let mut stdin = io::stdin().lock();

        loop {
            let bytes_read = stdin
                .read(&mut chunk)
                .context("Failed to read from stdin")?;
            if bytes_read == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..bytes_read]);
            check_size(buffer.len(), MAX_IMAGE_SIZE)?;
        }

        Ok(buffer)
    }
}

#[allow(clippy::cast_precision_loss)]
fn check_size(size: usize, max: usize) -> Result<()> {
    if size > max {
        bail!(
            "Error: Input size ({:.1} MB) exceeds maximum allowed size ({} MB).",
            size as f64 / 1024.0 / 1024.0,
            max / 1024 / 1024
        );
    }
    Ok(())
}

fn is_link(text: &str) -> bool {
    let trimmed = text.trim();
    (trimmed.starts_with("https://") || trimmed.starts_with("http://"))
        && !trimmed.contains(char::is_whitespace)
}
