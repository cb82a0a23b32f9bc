//! Regex patterns for reply scanning and item code recovery.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Largest brace-delimited span: first `{` through last `}`.
    pub static ref BRACE_SPAN: Regex = Regex::new(r"(?s)\{.*\}").unwrap();

    // NDC/SKU codes printed inside product descriptions
    pub static ref NDC_LABELED: Regex = Regex::new(
        r"(?i)(?:NDC|SKU)[:\s]*([0-9]{4,5}-?[0-9]{3,4}-?[0-9]{1,2})"
    ).unwrap();

    pub static ref NDC_STANDALONE: Regex = Regex::new(
        r"([0-9]{4,5}-?[0-9]{3,4}-?[0-9]{1,2})"
    ).unwrap();

    pub static ref ITEM_NUMBER: Regex = Regex::new(
        r"(?i)(?:SKU|Item)[:\s]*(\d+)"
    ).unwrap();

    // Product name: everything before the first printed code
    static ref NAME_PREFIX: Regex = Regex::new(
        r"(?is)^(.*?)(?:\([0-9-]{9,}\)|(?:NDC|SKU)[:\s]*[0-9-]+|$)"
    ).unwrap();

    static ref CODE_LABEL: Regex = Regex::new(r"(?i)(?:NDC|SKU)[:\s]*[0-9-]+").unwrap();

    static ref PARENTHESIZED: Regex = Regex::new(r"\([^)]*\)").unwrap();
}

/// Recover an NDC/SKU printed inside a product description.
///
/// Patterns are tried from most to least specific. Only used for display.
pub fn ndc_from_description(description: &str) -> Option<String> {
    [&*NDC_LABELED, &*NDC_STANDALONE, &*ITEM_NUMBER]
        .into_iter()
        .find_map(|re| re.captures(description))
        .map(|caps| caps[1].split_whitespace().collect())
}

/// Product name without printed codes or parenthesized notes.
///
/// Returns `N/A` when nothing is left. Only used for display.
pub fn clean_product_name(description: &str) -> String {
    let name = NAME_PREFIX
        .captures(description)
        .and_then(|caps| caps.get(1))
        .map_or(description, |m| m.as_str());
    let name = CODE_LABEL.replace_all(name, "");
    let name = PARENTHESIZED.replace_all(&name, "");
    let name = name.split_whitespace().collect::<Vec<_>>().join(" ");

    if name.is_empty() {
        "N/A".to_string()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brace_span_is_greedy() {
        let text = "a {\"x\": 1} b {\"y\": 2} c";
        let span = BRACE_SPAN.find(text).unwrap().as_str();
        assert_eq!(span, "{\"x\": 1} b {\"y\": 2}");
    }

    #[test]
    fn test_brace_span_crosses_lines() {
        let text = "```json\n{\n  \"a\": 1\n}\n```";
        assert_eq!(BRACE_SPAN.find(text).unwrap().as_str(), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_brace_span_needs_both_braces() {
        assert!(BRACE_SPAN.find("} nothing {").is_none());
        assert!(BRACE_SPAN.find("").is_none());
    }

    #[test]
    fn test_labeled_ndc() {
        assert_eq!(
            ndc_from_description("Lofena 25MG TABS NDC: 15370-0180-60").as_deref(),
            Some("15370-0180-60")
        );
        assert_eq!(
            ndc_from_description("sku 1234567890 Gabapentin").as_deref(),
            Some("1234567890")
        );
    }

    #[test]
    fn test_standalone_ndc() {
        assert_eq!(
            ndc_from_description("Metformin 500MG (12345-678-90)").as_deref(),
            Some("12345-678-90")
        );
    }

    #[test]
    fn test_item_number() {
        assert_eq!(ndc_from_description("Item 4821 Gauze pads").as_deref(), Some("4821"));
    }

    #[test]
    fn test_clean_product_name() {
        assert_eq!(clean_product_name("Lofena 25MG TABS (DICLOFENAC 25MG)"), "Lofena 25MG TABS");
        assert_eq!(clean_product_name("Amoxicillin  NDC: 65862-0017-01"), "Amoxicillin");
        assert_eq!(
            clean_product_name("Metformin 500MG (12345-678-90) 100CT"),
            "Metformin 500MG"
        );
        assert_eq!(clean_product_name("  Gauze Pads 4x4 "), "Gauze Pads 4x4");
    }

    #[test]
    fn test_clean_product_name_empty() {
        assert_eq!(clean_product_name(""), "N/A");
        assert_eq!(clean_product_name("NDC: 65862-0017-01"), "N/A");
        assert_eq!(clean_product_name("(DICLOFENAC)"), "N/A");
    }

    #[test]
    fn test_no_code() {
        assert_eq!(ndc_from_description("Lofena 25MG TABS (DICLOFENAC 25MG)"), None);
    }
}
