//! End-to-end extraction with a canned gateway.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pharmscan_core::{
    ExtractionPolicy, InferenceGateway, InvoiceExtractor, InvoiceImage, PharmscanError, Section,
    append_record, count_invoices,
};
use pretty_assertions::assert_eq;
use serde_json::json;

struct CannedGateway {
    reply: String,
    calls: AtomicUsize,
}

impl CannedGateway {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        })
    }
}

impl InferenceGateway for CannedGateway {
    fn infer(&self, image: &InvoiceImage, _instruction: &str) -> pharmscan_inference::Result<String> {
        assert_eq!(image.media_type(), "image/jpeg");
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }

    fn name(&self) -> &str {
        "canned"
    }
}

fn invoice_image() -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
    file.write_all(&[0xFF, 0xD8, 0xFF, 0xE0]).unwrap();
    file
}

const PHARMACY_REPLY: &str = r#"Here is the extracted invoice:
```json
{
  "company_info": {"company_name": "Keystone Pharma", "phone": null},
  "invoice_info": {"invoice_number": "KP-1042", "issue_date": "03/14/2024"},
  "items": [
    {
      "sku_ndc_number": "15370018060",
      "description_of_goods": "Lofena 25MG TABS (DICLOFENAC 25MG)",
      "quantity": 24,
      "rate": 365,
      "amount": 8760,
      "uqc": "CT"
    },
    {
      "sku_ndc_number": "99912345678",
      "description_of_goods": "Gauze Pads 4x4",
      "quantity": "10",
      "rate": "$2.50",
      "amount": 25,
      "uqc": "BOX"
    }
  ],
  "totals": {"subtotal": 8785, "total_invoice": 8785},
  "tax_info": null,
  "additional_info": null
}
```"#;

#[test]
fn wrapped_reply_becomes_record() {
    let gateway = CannedGateway::new(PHARMACY_REPLY);
    let extractor = InvoiceExtractor::new(gateway.clone());
    let image = invoice_image();

    let (record, message) = extractor.extract(image.path(), ExtractionPolicy::Permissive);

    assert_eq!(message, "");
    assert_eq!(
        record.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["company_info", "invoice_info", "items", "totals"]
    );
    assert!(record.section(Section::CompanyInfo).unwrap()["phone"].is_null());

    let items = record.line_items().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[1].rate, Some(2.5));
    assert_eq!(record.generated_code_count(), 1);
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn empty_reply_reports_parse_failure() {
    let extractor = InvoiceExtractor::new(CannedGateway::new(""));
    let image = invoice_image();

    let (record, message) = extractor.extract(image.path(), ExtractionPolicy::Strict);

    assert!(record.is_empty());
    assert_eq!(message, "Could not parse the response as JSON");
}

#[test]
fn missing_image_never_reaches_gateway() {
    let gateway = CannedGateway::new("{}");
    let extractor = InvoiceExtractor::new(gateway.clone());

    let (record, message) =
        extractor.extract(Path::new("does/not/exist.jpg"), ExtractionPolicy::Permissive);

    assert!(record.is_empty());
    assert!(message.starts_with("Error processing image: "));
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn extracted_records_append_to_csv() {
    let extractor = InvoiceExtractor::new(CannedGateway::new(
        &json!({"invoice_info": {"invoice_number": "A-1"}, "totals": {"total_invoice": 10}})
            .to_string(),
    ));
    let image = invoice_image();
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("extracted_invoices.csv");

    for _ in 0..3 {
        let (record, message) = extractor.extract(image.path(), ExtractionPolicy::Permissive);
        assert_eq!(message, "");
        append_record(&csv_path, &record).unwrap();
    }

    assert_eq!(count_invoices(&csv_path).unwrap(), 3);
    let content = std::fs::read_to_string(&csv_path).unwrap();
    assert!(content.starts_with("invoice_info,totals\n"));
}

#[test]
fn all_null_reply_is_not_saved() {
    let extractor = InvoiceExtractor::new(CannedGateway::new(
        r#"{"company_info": null, "tax_info": null}"#,
    ));
    let image = invoice_image();
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("extracted_invoices.csv");

    let (record, message) = extractor.extract(image.path(), ExtractionPolicy::Permissive);
    assert_eq!(message, "");
    assert!(record.is_empty());

    let err = append_record(&csv_path, &record).unwrap_err();
    assert!(matches!(err, PharmscanError::EmptyRecord));
    assert_eq!(err.to_string(), "No data to save. Please extract data first.");
    assert!(!csv_path.exists());
    assert_eq!(count_invoices(&csv_path).unwrap(), 0);
}

#[test]
fn extractor_is_shared_across_threads() {
    let gateway = CannedGateway::new(r#"{"totals": {"tax": 1}}"#);
    let extractor = InvoiceExtractor::new(gateway.clone());
    let image = invoice_image();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let (record, message) =
                    extractor.extract(image.path(), ExtractionPolicy::Permissive);
                assert_eq!(message, "");
                assert_eq!(record.len(), 1);
            });
        }
    });

    assert_eq!(gateway.calls.load(Ordering::SeqCst), 4);
}
