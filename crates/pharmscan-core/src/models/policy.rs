//! Extraction policy: how missing data is reported.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::record::Section;

/// Policy selecting the instruction variant handed to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionPolicy {
    /// Missing values come back as null; a missing item code may be
    /// generated with a `999` prefix.
    #[default]
    Permissive,
    /// Nothing is generated; missing text is `"NA"`, missing numbers `0`.
    Strict,
}

impl ExtractionPolicy {
    /// Sections requested under this policy, in instruction order.
    pub fn sections(&self) -> &'static [Section] {
        match self {
            ExtractionPolicy::Permissive => &[
                Section::CompanyInfo,
                Section::InvoiceInfo,
                Section::BillingInfo,
                Section::ShippingInfo,
                Section::Items,
                Section::Totals,
                Section::TaxInfo,
                Section::AdditionalInfo,
            ],
            ExtractionPolicy::Strict => &[
                Section::CompanyInfo,
                Section::BillingInfo,
                Section::ShippingInfo,
                Section::InvoiceInfo,
                Section::Items,
                Section::Totals,
            ],
        }
    }

    /// Whether the model may synthesize a missing item code.
    pub fn allows_generated_codes(&self) -> bool {
        matches!(self, ExtractionPolicy::Permissive)
    }

    /// Placeholder for a missing text field, if the policy uses one.
    pub fn text_sentinel(&self) -> Option<&'static str> {
        match self {
            ExtractionPolicy::Permissive => None,
            ExtractionPolicy::Strict => Some("NA"),
        }
    }

    /// Placeholder for a missing numeric field, if the policy uses one.
    pub fn number_sentinel(&self) -> Option<u32> {
        match self {
            ExtractionPolicy::Permissive => None,
            ExtractionPolicy::Strict => Some(0),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionPolicy::Permissive => "permissive",
            ExtractionPolicy::Strict => "strict",
        }
    }
}

impl fmt::Display for ExtractionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtractionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "permissive" => Ok(ExtractionPolicy::Permissive),
            "strict" => Ok(ExtractionPolicy::Strict),
            other => Err(format!("unknown extraction policy: {}", other)),
        }
    }
}
