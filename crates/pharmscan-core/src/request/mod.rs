//! Instruction text handed to the model with each invoice image.
//!
//! Both variants share the preamble, the example item and the JSON
//! shape renderer. They differ in the rules for missing item codes,
//! the fallback values and the extended field set.

pub mod schema;

use crate::models::policy::ExtractionPolicy;

const PREAMBLE: &str = "Extract all data from this pharmacy invoice and return it in a structured JSON format.";

const CODE_FORMATS: &str =
    "   - Look for numbers in these formats: 12345-678-90, 1234567890, 12345678901, 1234-5678-90";

const PERMISSIVE_CODE_RULES: &str = "\
   - The code usually has its own column in front of the product name or description, and each product has a different code
   - If there is a product there must be a code, since every product has a unique SKU
   - If no code is printed for an item, generate a unique 10-11 digit code starting with '999' so it can be told apart from a real one";

const STRICT_CODE_RULES: &str = "\
   - Look only in a separate column specifically for the SKU/NDC/HSN code
   - Never take the code from the product description or any other field
   - If no code is found, use \"NA\". Do not generate or make up codes";

const DESCRIPTION_RULES: &str = "\
2. For product descriptions:
   - Keep the full description including strength and form (e.g., \"Lofena 25MG TABS (DICLOFENAC 25MG)\")
   - Include both brand and generic names when present";

const EXAMPLE_ITEM: &str = r#"EXAMPLE ITEM:
{
  "sku_ndc_number": "15370018060",
  "description_of_goods": "Lofena 25MG TABS (DICLOFENAC 25MG)",
  "quantity": 24,
  "rate": 365,
  "amount": 8760,
  "uqc": "CT"
}"#;

const PERMISSIVE_RULES: &str = "\
IMPORTANT RULES:
1. If any field is not present or not applicable, set it to null
2. For the items array, include ALL items found on the invoice with their complete details
3. Make sure all numerical values are formatted as numbers, not strings
4. Apart from a generated item code, only extract data that is actually present on the invoice
5. For product names, include both brand and generic names if available";

const STRICT_RULES: &str = "\
IMPORTANT RULES:
1. For missing text fields, use \"NA\"
2. For missing numeric fields, use 0
3. SKU/NDC must only come from a dedicated column, not from descriptions
4. Never make up or hallucinate data - only extract what is visible
5. Do not calculate any values; for totals only include values explicitly shown on the invoice, otherwise 0
6. For items, include ALL products exactly as listed";

/// Build the instruction for `policy`. Pure and infallible.
pub fn build_instruction(policy: ExtractionPolicy) -> String {
    let (code_rules, closing_rules) = match policy {
        ExtractionPolicy::Permissive => (PERMISSIVE_CODE_RULES, PERMISSIVE_RULES),
        ExtractionPolicy::Strict => (STRICT_CODE_RULES, STRICT_RULES),
    };

    format!(
        "{PREAMBLE}\n\n\
         CRITICAL INSTRUCTIONS:\n\
         1. For each item, you MUST extract the NDC (National Drug Code) or SKU:\n\
         {CODE_FORMATS}\n\
         {code_rules}\n\n\
         {DESCRIPTION_RULES}\n\n\
         {EXAMPLE_ITEM}\n\n\
         Return the response in this exact JSON structure, with every section and field shown:\n\
         {shape}\n\n\
         {closing_rules}\n\
         Return only the JSON object.",
        shape = schema::render_shape(policy),
    )
}
