//! Small formatting and path helpers for the CLI.

use std::path::{Path, PathBuf};

/// Format a byte count for humans.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MiB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Format a compression ratio as a percentage of the original.
pub fn format_ratio(compressed: u64, original: u64) -> String {
    if original == 0 {
        return "-".into();
    }
    format!("{:.1}%", compressed as f64 * 100.0 / original as f64)
}

/// Derive an output path by swapping the extension.
pub fn with_extension(input: &Path, ext: &str) -> PathBuf {
    let mut out = input.to_path_buf();
    out.set_extension(ext);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MiB");
    }

    #[test]
    fn test_format_ratio() {
        assert_eq!(format_ratio(500, 1000), "50.0%");
        assert_eq!(format_ratio(1, 0), "-");
    }

    #[test]
    fn test_with_extension() {
        assert_eq!(
            with_extension(Path::new("demo/app.wasm"), "qrw"),
            PathBuf::from("demo/app.qrw")
        );
    }
}
