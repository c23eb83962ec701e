/// Extensions offered by the upload picker
pub const ACCEPTED_EXTENSIONS: [&str; 5] = ["pdf", "txt", "md", "doc", "docx"];

/// Human readable size: bytes below 1 KiB, one-decimal KB below 1 MiB, MB above.
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;

    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}

/// Whether a filename carries one of [`ACCEPTED_EXTENSIONS`]
pub fn is_accepted_upload(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| {
            let ext = ext.to_lowercase();
            ACCEPTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(500), "500 B");
        assert_eq!(format_file_size(1023), "1023 B");
    }

    #[test]
    fn test_format_kilobytes() {
        assert_eq!(format_file_size(1024), "1.0 KB");
        assert_eq!(format_file_size(2048), "2.0 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
    }

    #[test]
    fn test_format_megabytes() {
        assert_eq!(format_file_size(1_048_576), "1.0 MB");
        assert_eq!(format_file_size(5 * 1_048_576 + 524_288), "5.5 MB");
    }

    #[test]
    fn test_accepted_uploads() {
        assert!(is_accepted_upload("a.pdf"));
        assert!(is_accepted_upload("B.DOCX"));
        assert!(!is_accepted_upload("image.png"));
        assert!(!is_accepted_upload("Makefile"));
    }
}
