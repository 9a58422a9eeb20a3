pub mod format_utils {
    pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
    pub const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

    // Binary megabytes (1,048,576 bytes)
    pub fn bytes_to_mb(bytes: i64) -> f64 {
        bytes as f64 / BYTES_PER_MB
    }

    // Binary gigabytes (1,073,741,824 bytes)
    pub fn bytes_to_gb(bytes: i64) -> f64 {
        bytes as f64 / BYTES_PER_GB
    }

    // Render a gigabyte figure with two decimals, e.g. "6.00 GB"
    pub fn format_gb(gb: f64) -> String {
        format!("{:.2} GB", gb)
    }
}

pub mod query_utils {
    use std::collections::HashMap;

    // Decode an `a=1&b=2` query string; `+` and percent escapes are decoded.
    // Repeated keys keep the first value.
    pub fn parse_query(query: &str) -> HashMap<String, String> {
        let mut params = HashMap::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            params
                .entry(key.into_owned())
                .or_insert_with(|| value.into_owned());
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::format_utils::*;
    use super::query_utils::parse_query;

    #[test]
    fn test_binary_units() {
        assert_eq!(bytes_to_mb(1_048_576), 1.0);
        assert_eq!(bytes_to_mb(524_288), 0.5);
        assert_eq!(bytes_to_gb(1_073_741_824), 1.0);
        assert_eq!(bytes_to_gb(-1_073_741_824), -1.0);
        assert_eq!(format_gb(6.0), "6.00 GB");
        assert_eq!(format_gb(-0.5), "-0.50 GB");
    }

    #[test]
    fn test_parse_query_decodes_values() {
        let params = parse_query("user=bob%20smith&limit=7d&x=a+b&user=other");
        assert_eq!(params.get("user").map(String::as_str), Some("bob smith"));
        assert_eq!(params.get("limit").map(String::as_str), Some("7d"));
        assert_eq!(params.get("x").map(String::as_str), Some("a b"));
    }

    #[test]
    fn test_parse_query_empty_value() {
        let params = parse_query("user=&limit");
        assert_eq!(params.get("user").map(String::as_str), Some(""));
        assert_eq!(params.get("limit").map(String::as_str), Some(""));
    }
}
