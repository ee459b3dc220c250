
/// Format bytes in human-readable format (B, KB, MB, GB, TB)
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Total bandwidth of a capture: below 10^9 bytes in Mbps, otherwise in Gbps.
pub fn format_total_bandwidth(bytes: u64) -> String {
    if bytes < 1_000_000_000 {
        format!("{:.2} Mbps", bytes as f64 / 1_000_000.0)
    } else {
        format!("{:.2} Gbps", bytes as f64 / 1_000_000_000.0)
    }
}

pub fn format_percentage(value: f64) -> String {
    format!("{:.2}", value)
}

/// Truncate string to specified length with ellipsis
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(350), "350 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
    }

    #[test]
    fn test_format_total_bandwidth() {
        assert_eq!(format_total_bandwidth(0), "0.00 Mbps");
        assert_eq!(format_total_bandwidth(350), "0.00 Mbps");
        assert_eq!(format_total_bandwidth(12_345_678), "12.35 Mbps");
        assert_eq!(format_total_bandwidth(999_999_999), "1000.00 Mbps");
        assert_eq!(format_total_bandwidth(2_500_000_000), "2.50 Gbps");
    }

    #[test]
    fn test_format_percentage() {
        assert_eq!(format_percentage(200.0 / 3.0), "66.67");
        assert_eq!(format_percentage(100.0), "100.00");
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("hi", 2), "hi");
    }
}
