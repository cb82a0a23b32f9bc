//! Decoded invoice record and typed views over it.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::patterns::{clean_product_name, ndc_from_description};

/// Top-level sections of an invoice record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    CompanyInfo,
    InvoiceInfo,
    BillingInfo,
    ShippingInfo,
    Items,
    Totals,
    TaxInfo,
    AdditionalInfo,
}

impl Section {
    pub const ALL: [Section; 8] = [
        Section::CompanyInfo,
        Section::InvoiceInfo,
        Section::BillingInfo,
        Section::ShippingInfo,
        Section::Items,
        Section::Totals,
        Section::TaxInfo,
        Section::AdditionalInfo,
    ];

    /// JSON key of the section.
    pub fn key(&self) -> &'static str {
        match self {
            Section::CompanyInfo => "company_info",
            Section::InvoiceInfo => "invoice_info",
            Section::BillingInfo => "billing_info",
            Section::ShippingInfo => "shipping_info",
            Section::Items => "items",
            Section::Totals => "totals",
            Section::TaxInfo => "tax_info",
            Section::AdditionalInfo => "additional_info",
        }
    }

    /// Human-readable heading.
    pub fn title(&self) -> &'static str {
        match self {
            Section::CompanyInfo => "Company",
            Section::InvoiceInfo => "Invoice",
            Section::BillingInfo => "Bill To",
            Section::ShippingInfo => "Ship To",
            Section::Items => "Items",
            Section::Totals => "Totals",
            Section::TaxInfo => "Tax",
            Section::AdditionalInfo => "Additional Info",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.key() == key)
    }
}

/// A decoded invoice: top-level keys in reply order, null values removed.
///
/// A key that is absent means no data of that kind was found. Nested
/// values are passed through exactly as the model produced them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceRecord(Map<String, Value>);

impl InvoiceRecord {
    /// An empty record, returned alongside every failure.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from a JSON object, dropping null-valued keys.
    pub fn from_object(object: Map<String, Value>) -> Self {
        Self(object.into_iter().filter(|(_, v)| !v.is_null()).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Value of a known section.
    pub fn section(&self, section: Section) -> Option<&Value> {
        self.0.get(section.key())
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn as_object(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Typed view of `items`. Empty when the record has no items.
    pub fn line_items(&self) -> Result<Vec<LineItem>, serde_json::Error> {
        match self.section(Section::Items) {
            Some(items) => Vec::<LineItem>::deserialize(items),
            None => Ok(Vec::new()),
        }
    }

    /// Number of items whose code was generated rather than read.
    pub fn generated_code_count(&self) -> usize {
        self.line_items()
            .map(|items| items.iter().filter(|i| i.has_generated_sku()).count())
            .unwrap_or(0)
    }
}

/// One invoice row.
///
/// Parsing is lenient: numbers may arrive as JSON numbers or numeric
/// strings, codes as strings or numbers. Unreadable values become `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default, deserialize_with = "lenient_text")]
    pub sku_ndc_number: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub description_of_goods: Option<String>,

    #[serde(default, deserialize_with = "lenient_number")]
    pub quantity: Option<f64>,

    #[serde(default, deserialize_with = "lenient_number")]
    pub rate: Option<f64>,

    #[serde(default, deserialize_with = "lenient_number")]
    pub amount: Option<f64>,

    /// Unit of measure (CT, EA, BTL, ...).
    #[serde(default, deserialize_with = "lenient_text")]
    pub uqc: Option<String>,

    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,

    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

impl LineItem {
    /// Prefix marking a code the model generated because none was printed.
    pub const GENERATED_SKU_PREFIX: &'static str = "999";

    /// True for a 10-11 digit code starting with `999`.
    pub fn has_generated_sku(&self) -> bool {
        self.sku_ndc_number.as_deref().is_some_and(|sku| {
            let sku = sku.trim();
            sku.starts_with(Self::GENERATED_SKU_PREFIX)
                && (10..=11).contains(&sku.len())
                && sku.chars().all(|c| c.is_ascii_digit())
        })
    }

    /// True when no code was read (absent, blank or the `NA` sentinel).
    pub fn sku_missing(&self) -> bool {
        match self.sku_ndc_number.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(sku) => sku.eq_ignore_ascii_case("NA") || sku.eq_ignore_ascii_case("N/A"),
        }
    }

    /// Code to show an operator: the extracted code, else one recovered
    /// from the description. The item itself is never modified.
    pub fn display_sku(&self) -> Option<String> {
        if !self.sku_missing() {
            return self.sku_ndc_number.as_ref().map(|s| s.trim().to_string());
        }
        self.description_of_goods
            .as_deref()
            .and_then(ndc_from_description)
    }

    /// Description trimmed to the product name, `N/A` when there is none.
    pub fn display_name(&self) -> String {
        clean_product_name(self.description_of_goods.as_deref().unwrap_or_default())
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s
            .trim()
            .trim_start_matches('$')
            .replace(',', "")
            .parse()
            .ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(value: Value) -> InvoiceRecord {
        match value {
            Value::Object(map) => InvoiceRecord::from_object(map),
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_from_object_drops_only_top_level_nulls() {
        let rec = record(json!({
            "company_info": {"company_name": "Acme", "gstin": null},
            "items": null,
            "totals": {"subtotal": 0}
        }));
        assert_eq!(rec.len(), 2);
        assert!(!rec.contains_key("items"));
        assert_eq!(rec.get("company_info").unwrap()["gstin"], Value::Null);
    }

    #[test]
    fn test_key_order_is_preserved() {
        let rec = record(json!({"totals": {}, "company_info": {}, "billing_info": {}}));
        let keys: Vec<&str> = rec.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["totals", "company_info", "billing_info"]);
    }

    #[test]
    fn test_line_items_are_lenient() {
        let rec = record(json!({
            "items": [
                {
                    "sku_ndc_number": 15370018060u64,
                    "description_of_goods": "Lofena 25MG TABS (DICLOFENAC 25MG)",
                    "quantity": "24",
                    "rate": "$365.00",
                    "amount": 8760,
                    "uqc": "CT"
                },
                { "description_of_goods": "Gauze", "quantity": "a few" }
            ]
        }));

        let items = rec.line_items().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].sku_ndc_number.as_deref(), Some("15370018060"));
        assert_eq!(items[0].quantity, Some(24.0));
        assert_eq!(items[0].rate, Some(365.0));
        assert_eq!(items[0].amount, Some(8760.0));
        assert_eq!(items[1].quantity, None);
        assert!(items[1].sku_missing());
    }

    #[test]
    fn test_line_items_absent() {
        assert!(InvoiceRecord::new().line_items().unwrap().is_empty());
    }

    #[test]
    fn test_line_items_wrong_shape_is_error() {
        let rec = record(json!({"items": "none"}));
        assert!(rec.line_items().is_err());
    }

    #[test]
    fn test_generated_sku_detection() {
        let item = |sku: &str| LineItem {
            sku_ndc_number: Some(sku.to_string()),
            ..Default::default()
        };
        assert!(item("9991234567").has_generated_sku());
        assert!(item("99912345678").has_generated_sku());
        assert!(!item("999123456").has_generated_sku());
        assert!(!item("15370018060").has_generated_sku());
        assert!(!item("999-1234-567").has_generated_sku());
        assert!(!item("NA").has_generated_sku());
    }

    #[test]
    fn test_generated_code_count() {
        let rec = record(json!({
            "items": [
                {"sku_ndc_number": "9990000000001"},
                {"sku_ndc_number": "99900000001"},
                {"sku_ndc_number": "15370018060"}
            ]
        }));
        assert_eq!(rec.generated_code_count(), 1);
    }

    #[test]
    fn test_display_sku_falls_back_to_description() {
        let item = LineItem {
            sku_ndc_number: Some("NA".to_string()),
            description_of_goods: Some("Amoxicillin 500MG CAPS NDC: 65862-0017-01".to_string()),
            ..Default::default()
        };
        assert!(item.sku_missing());
        assert_eq!(item.display_sku().as_deref(), Some("65862-0017-01"));
        assert_eq!(item.display_name(), "Amoxicillin 500MG CAPS");
    }

    #[test]
    fn test_display_name_without_description() {
        assert_eq!(LineItem::default().display_name(), "N/A");
    }

    #[test]
    fn test_section_keys_round_trip() {
        for section in Section::ALL {
            assert_eq!(Section::from_key(section.key()), Some(section));
        }
        assert_eq!(Section::from_key("vendor"), None);
    }
}
