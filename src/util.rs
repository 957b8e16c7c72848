//! File helpers used by the CLI around the pipeline.

use std::fs;
use std::path::Path;

use crate::codec::sniff_format;
use crate::error::{UpscaleError, UpscaleResult};

/// Largest file accepted from disk (10 MiB).
pub const DEFAULT_INPUT_SIZE_LIMIT: u64 = 10 * 1024 * 1024;

/// Format a byte count for humans: `0 Bytes`, `512 Bytes`, `1.5 KB`, `2 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut exp = 0;
    let mut whole = bytes;
    while whole >= 1024 && exp < UNITS.len() - 1 {
        whole /= 1024;
        exp += 1;
    }
    let value = bytes as f64 / 1024f64.powi(exp as i32);
    let rounded = (value * 100.0).round() / 100.0;
    // Trim trailing zeros the same way a float-to-string round trip would.
    let text = format!("{:.2}", rounded);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", text, UNITS[exp])
}

/// Read an image file, enforcing the size ceiling and a recognisable format.
pub fn read_image_file(path: &Path, limit: u64) -> UpscaleResult<Vec<u8>> {
    let display = path.display().to_string();
    let meta = fs::metadata(path)
        .map_err(|e| UpscaleError::io("stat input", e).with_path(&display))?;
    if meta.len() > limit {
        return Err(UpscaleError::too_large(meta.len(), limit)
            .with_context(format!("reading {}", display))
            .with_recovery_suggestion(format!(
                "select an image under {}",
                format_file_size(limit)
            )));
    }

    let bytes = fs::read(path).map_err(|e| UpscaleError::io("read input", e).with_path(&display))?;
    if sniff_format(&bytes).is_none() {
        return Err(UpscaleError::invalid_argument(
            "input",
            display,
            "not a valid image file",
        ));
    }
    Ok(bytes)
}

/// Write the enhanced image.
pub fn write_output(path: &Path, bytes: &[u8]) -> UpscaleResult<()> {
    fs::write(path, bytes)
        .map_err(|e| UpscaleError::io("write output", e).with_path(path.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;

    #[test]
    fn formats_sizes() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5 MB");
        assert_eq!(format_file_size(1_234_567), "1.18 MB");
        assert_eq!(format_file_size(1024 * 1024), "1 MB");
    }

    #[test]
    fn rejects_non_images() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"just some text").unwrap();
        let err = read_image_file(file.path(), DEFAULT_INPUT_SIZE_LIMIT).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn rejects_files_over_limit() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 64]).unwrap();
        let err = read_image_file(file.path(), 32).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TooLarge);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_image_file(Path::new("/nonexistent/in.png"), 10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("/nonexistent/in.png"));
    }
}
