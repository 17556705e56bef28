//! Terminal output utilities.

use colored::{ColoredString, Colorize};

/// Format a value as a quoted, right-aligned field.
///
/// # Arguments
/// * `value` - The value to format
/// * `width` - The minimum width of the field
pub fn format_field<T: ToString>(value: T, width: usize) -> String {
    let quoted = format!("\"{}\"", value.to_string());
    format!("{quoted:>width$}")
}

/// A quoted, right-aligned status field. Padding is counted on the plain text
/// and only the status itself is colored, so columns line up with color on.
pub fn status_field(status: &str, width: usize) -> String {
    let pad = width.saturating_sub(status.chars().count() + 2);
    format!("{}\"{}\"", " ".repeat(pad), status_label(status))
}

/// Status text colored by how much of the space is handed out.
pub fn status_label(status: &str) -> ColoredString {
    match status {
        "assigned" | "split" => status.red(),
        "reserved" | "in-warehouse" => status.yellow(),
        "wait" | "out-warehouse" => status.green(),
        other => other.normal(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_field_pads() {
        assert_eq!(format_field("wait", 10), "    \"wait\"");
        assert_eq!(format_field(42, 6), "  \"42\"");
    }

    #[test]
    fn test_format_field_long_value_is_kept() {
        assert_eq!(format_field("10.0.0.0/24", 5), "\"10.0.0.0/24\"");
    }

    #[test]
    fn test_status_label_text() {
        colored::control::set_override(false);
        assert_eq!(status_label("assigned").to_string(), "assigned");
        assert_eq!(status_label("-gap-").to_string(), "-gap-");
    }

    #[test]
    fn test_status_field_pads_visible_text() {
        for status in ["wait", "assigned", "-gap-"] {
            let field = status_field(status, 10);
            let pad = field.len() - field.trim_start().len();
            assert_eq!(pad, 10 - status.len() - 2, "{field:?}");
            assert!(field.ends_with('"'));
            assert!(field.contains(status));
        }
        assert_eq!(status_field("out-warehouse", 5).trim_start().len(), status_field("out-warehouse", 5).len());
    }
}
