//! Field tables for the JSON shape the model is asked to return.

use crate::models::policy::ExtractionPolicy;
use crate::models::record::Section;

/// JSON type expected for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
}

/// One field of the requested shape.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Extra guidance shown next to the type.
    pub hint: &'static str,
}

/// One top-level section with its fields.
#[derive(Debug, Clone, Copy)]
pub struct SectionSpec {
    pub section: Section,
    pub fields: &'static [FieldSpec],
}

const fn text(name: &'static str, hint: &'static str) -> FieldSpec {
    FieldSpec { name, kind: FieldKind::Text, hint }
}

const fn number(name: &'static str, hint: &'static str) -> FieldSpec {
    FieldSpec { name, kind: FieldKind::Number, hint }
}

const PERMISSIVE: &[SectionSpec] = &[
    SectionSpec {
        section: Section::CompanyInfo,
        fields: &[
            text("company_name", ""),
            text("company_address", ""),
            text("city", ""),
            text("state", ""),
            text("pincode", ""),
            text("gstin", ""),
            text("email", ""),
            text("phone", ""),
        ],
    },
    SectionSpec {
        section: Section::InvoiceInfo,
        fields: &[
            text("invoice_number", ""),
            text("issue_date", ""),
            text("due_date", ""),
            text("payment_terms", ""),
            text("sales_person", ""),
            text("order_number", ""),
        ],
    },
    SectionSpec {
        section: Section::BillingInfo,
        fields: &[
            text("bill_to_name", ""),
            text("bill_to_address", ""),
            text("bill_to_city", ""),
            text("bill_to_state", ""),
            text("bill_to_pincode", ""),
            text("bill_to_gstin", ""),
        ],
    },
    SectionSpec {
        section: Section::ShippingInfo,
        fields: &[
            text("ship_to_name", ""),
            text("ship_to_address", ""),
            text("ship_to_city", ""),
            text("ship_to_state", ""),
            text("ship_to_pincode", ""),
        ],
    },
    SectionSpec {
        section: Section::Items,
        fields: &[
            text(
                "sku_ndc_number",
                "10-11 digit NDC/SKU, e.g. 12345-678-90 or 12345678901; every product has one, generate a 999-prefixed code only if none is printed",
            ),
            text(
                "description_of_goods",
                "full product description including brand and generic names, e.g. 'Lofena 25MG TABS (DICLOFENAC 25MG)'",
            ),
            text("size", "pack size or strength if shown separately"),
            number("quantity", "quantity as a number, not string"),
            number("rate", "price per unit as number, not string"),
            number("amount", "total for this line item as number, not string"),
            text("uqc", "unit of measure, e.g. 'CT' for count, 'BOX', 'BTL', 'EA'"),
            text(
                "expiry_date",
                "MM/YYYY or DD/MM/YYYY if available, extract from description if needed",
            ),
        ],
    },
    SectionSpec {
        section: Section::Totals,
        fields: &[
            number("subtotal", "sum of all line items before tax and discounts"),
            number("shipping", "shipping/handling charges if any"),
            number("discount", "any discounts applied"),
            number("tax", "total tax amount"),
            number("total_invoice", "final total amount to pay"),
        ],
    },
    SectionSpec {
        section: Section::TaxInfo,
        fields: &[
            number("cgst", "if applicable"),
            number("sgst", "if applicable"),
            number("igst", "if applicable"),
        ],
    },
    SectionSpec {
        section: Section::AdditionalInfo,
        fields: &[text("notes", ""), text("terms_and_conditions", "")],
    },
];

const STRICT: &[SectionSpec] = &[
    SectionSpec {
        section: Section::CompanyInfo,
        fields: &[text("company_name", "")],
    },
    SectionSpec {
        section: Section::BillingInfo,
        fields: &[
            text("billing_company_name", ""),
            text("billing_address", ""),
        ],
    },
    SectionSpec {
        section: Section::ShippingInfo,
        fields: &[
            text("shipping_company_name", ""),
            text("shipping_address", ""),
        ],
    },
    SectionSpec {
        section: Section::InvoiceInfo,
        fields: &[
            text("gst_invoice_number", ""),
            text("invoice_date", ""),
            text("due_date", ""),
            text("sales_person", ""),
            text("order_number", ""),
        ],
    },
    SectionSpec {
        section: Section::Items,
        fields: &[
            text("sku_ndc_number", "only from a dedicated SKU/NDC/HSN column"),
            text("description_of_goods", "product name/description"),
            number("quantity", ""),
            number("rate", ""),
            number("amount", ""),
            text("uqc", "e.g. 'CT', 'BOX', 'BTL'"),
        ],
    },
    SectionSpec {
        section: Section::Totals,
        fields: &[
            number("subtotal", "only if printed on the invoice"),
            number("shipping", ""),
            number("discount", ""),
            number("tax", ""),
            number("total_invoice", ""),
        ],
    },
];

/// Sections and fields requested under `policy`.
pub fn sections(policy: ExtractionPolicy) -> &'static [SectionSpec] {
    match policy {
        ExtractionPolicy::Permissive => PERMISSIVE,
        ExtractionPolicy::Strict => STRICT,
    }
}

/// Render the JSON shape description embedded in the instruction.
pub fn render_shape(policy: ExtractionPolicy) -> String {
    let entries = sections(policy);
    let mut out = String::from("{\n");

    for (i, entry) in entries.iter().enumerate() {
        let repeated = entry.section == Section::Items;
        let indent = if repeated { "      " } else { "    " };

        if repeated {
            out.push_str(&format!("  \"{}\": [\n    {{\n", entry.section.key()));
        } else {
            out.push_str(&format!("  \"{}\": {{\n", entry.section.key()));
        }

        for (j, field) in entry.fields.iter().enumerate() {
            let comma = if j + 1 < entry.fields.len() { "," } else { "" };
            out.push_str(&format!(
                "{}\"{}\": \"{}\"{}\n",
                indent,
                field.name,
                describe(field, policy),
                comma
            ));
        }

        let comma = if i + 1 < entries.len() { "," } else { "" };
        if repeated {
            out.push_str(&format!("    }}\n  ]{}\n", comma));
        } else {
            out.push_str(&format!("  }}{}\n", comma));
        }
    }

    out.push('}');
    out
}

fn describe(field: &FieldSpec, policy: ExtractionPolicy) -> String {
    let base = match field.kind {
        FieldKind::Text => "string",
        FieldKind::Number => "number",
    };

    let mut details = Vec::new();
    if !field.hint.is_empty() {
        details.push(field.hint.to_string());
    }
    match field.kind {
        FieldKind::Text => {
            if let Some(sentinel) = policy.text_sentinel() {
                details.push(format!("'{}' if not found", sentinel));
            }
        }
        FieldKind::Number => {
            if let Some(sentinel) = policy.number_sentinel() {
                details.push(format!("{} if not found", sentinel));
            }
        }
    }

    if details.is_empty() {
        base.to_string()
    } else {
        format!("{} ({})", base, details.join("; "))
    }
}
