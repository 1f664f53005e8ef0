//! Accessibility tree compression.
//!
//! Raw UI structure dumps carry ephemeral memory addresses and a large
//! number of uninformative generic container nodes. Compressing them keeps
//! the model's observation of the screen compact and stable across runs.

use once_cell::sync::Lazy;
use regex::Regex;

static MEMORY_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"0x[0-9a-fA-F]+").expect("address pattern compiles"));

/// Compress a raw accessibility tree dump.
///
/// Strips hexadecimal address tokens, collapses the `, ,` artifacts that
/// stripping leaves behind, and drops `Other,` container lines unless they
/// still carry an `identifier:`, `label:` or `placeholderValue:` annotation.
///
/// Pure and idempotent: compressing an already compressed tree is a no-op.
pub fn compress(tree: &str) -> String {
    let cleaned = MEMORY_ADDRESS.replace_all(tree, "").replace(", ,", ",");

    cleaned
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            if !trimmed.starts_with("Other,") {
                return true;
            }
            trimmed.contains("identifier:")
                || trimmed.contains("label:")
                || trimmed.contains("placeholderValue:")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_memory_addresses() {
        let raw = "Button, 0x14f60a900, {{0.0, 56.3}, {402.0, 44.0}}, label: 'Done'";
        let compressed = compress(raw);
        assert!(!compressed.contains("0x"));
        assert!(compressed.contains("label: 'Done'"));
    }

    #[test]
    fn test_collapses_double_comma_artifact() {
        let raw = "Settings, 0x14f60a900,label:Settings";
        assert_eq!(compress(raw), "Settings,label:Settings");
    }

    #[test]
    fn test_drops_generic_container_lines() {
        let raw = "Other, {{0, 0}, {390, 844}}\n\
                   Other, {{0, 0}, {390, 100}}, identifier: 'header'\n\
                   Other, {{0, 100}, {390, 44}}, label: 'Search'\n\
                   Other, {{0, 144}, {390, 44}}, placeholderValue: 'Type here'\n\
                   Button, {{10, 10}, {40, 40}}";
        let compressed = compress(raw);
        let lines: Vec<_> = compressed.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines.iter().all(|l| !l.trim_end().ends_with("{390, 844}}")));
    }

    #[test]
    fn test_keeps_non_other_lines_untouched() {
        let raw = "StaticText, {{0, 0}, {100, 20}}, 'Wi-Fi'";
        assert_eq!(compress(raw), raw);
    }

    #[test]
    fn test_idempotent() {
        let raw = "Application, 0x600001d, {{0.0, 0.0}, {390.0, 844.0}}, label: 'Settings'\n\
                   Other, 0x600002e, {{0, 0}, {390, 844}}\n\
                   Cell, 0x600003f, {{0, 100}, {390, 44}}, label: 'Wi-Fi'";
        let once = compress(raw);
        assert_eq!(compress(&once), once);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(compress(""), "");
    }
}
