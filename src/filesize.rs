//! Human-readable byte counts for progress output.

const UNITS: [&str; 8] = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB"];

/// Format a byte count as e.g. `"1.5 KB"`. Unknown sizes render as `"N/A"`.
pub fn filesize_to_english(bytes: Option<u64>) -> String {
    let Some(bytes) = bytes else {
        return "N/A".to_string();
    };

    let mut size = bytes as f64;
    for unit in UNITS {
        if size < 1024.0 {
            return format!("{:3.1} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.1} YB", size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_kilobytes() {
        assert_eq!(filesize_to_english(Some(1536)), "1.5 KB");
    }

    #[test]
    fn unknown_size() {
        assert_eq!(filesize_to_english(None), "N/A");
    }

    #[test]
    fn small_and_large_units() {
        assert_eq!(filesize_to_english(Some(0)), "0.0 B");
        assert_eq!(filesize_to_english(Some(512)), "512.0 B");
        assert_eq!(filesize_to_english(Some(1024 * 1024)), "1.0 MB");
        assert_eq!(filesize_to_english(Some(3 * 1024 * 1024 * 1024)), "3.0 GB");
    }

    #[test]
    fn largest_unit() {
        assert_eq!(filesize_to_english(Some(u64::MAX)), "16.0 EB");
    }
}
