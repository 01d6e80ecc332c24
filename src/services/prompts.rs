//! Prompt text and builders for the intelligence service

use phf::phf_map;

use crate::models::{Category, CategoryContext, ConsolidationRequest};

pub const CLASSIFICATION_PROMPT: &str = r#"You classify business documents. Read the document and pick exactly one category.

CATEGORIES:
- VAT: VAT returns, VAT assessments, VAT registration or correspondence with a VAT office.
- TAX: income or corporate tax returns, assessments and certificates that are not about VAT.
- PAYMENTS: invoices, bills, payment requests, reminders, dunning letters, receipts.
- CERTIFICATES: third-party proof of status such as ISO certificates or certificates of good standing.
- REGISTRATION: official company registrations, trade register extracts, licences, permits.
- LEGAL: contracts, legal notices, court documents, compliance letters.
- FINANCIAL: bank statements, balance sheets, financial reports, anything that summarises many transactions.
- INSURANCE: policies, claims, premium notices, coverage documents.
- GENERAL: other business correspondence, portal sign-ups, informational letters.
- UNCLASSIFIABLE: unreadable, blank or non-business content.

RULES:
1. An invoice belongs in PAYMENTS even if it lists VAT. A document about VAT itself belongs in VAT.
2. Use PAYMENTS for a single transaction and FINANCIAL for summaries of many.
3. Use REGISTRATION only for official registrations. Service sign-ups are GENERAL.
4. Blank forms are classified by their intended purpose, with subcategory "Blank Form".

Respond ONLY with a JSON object:
{
  "category": "<one of the categories above>",
  "confidence": 0.95,
  "reasoning": "<one sentence>",
  "subcategory": "<specific document type, e.g. \"Payment Reminder\">"
}"#;

pub const SINGLE_DOCUMENT_PROMPT: &str = r#"You analyse a single business document.

Identify its type and language, extract the important facts (amounts, dates, names, reference numbers) and give recommendations that quote those exact facts.

Respond ONLY with a JSON object:
{
  "language": "<detected language>",
  "document_type": "<e.g. Invoice, Contract, VAT Return>",
  "detailed_summary": "<summary with concrete amounts, dates and parties>",
  "actionable_recommendations": ["<e.g. Pay invoice INV-001 for 500 EUR by 2024-12-15>"],
  "key_details": {"<field>": "<value>"}
}"#;

pub const ANALYSIS_PROMPT: &str = r#"You analyse document text that has already been classified.

1. Extract structured key details. The fields MUST fit the document category.
2. Recommendations must quote exact details from the text: amounts, dates, references, IBANs.
3. If nothing needs to be done, say so in the summary and return an empty list of recommendations.

Respond ONLY with a JSON object:
{
  "comprehensive_summary": "<summary with concrete amounts, dates and parties>",
  "key_findings": ["<finding>"],
  "detailed_recommendations": ["<recommendation with exact details>"],
  "priority_actions": ["<most urgent action>"],
  "key_details": {"<field>": "<value>"}
}"#;

/// Fields the model should look for, keyed by category name
static CATEGORY_FIELDS: phf::Map<&'static str, &'static [&'static str]> = phf_map! {
    "PAYMENTS" => &["invoice_number", "due_date", "total_amount", "currency", "sender_name", "receiver_name", "iban", "payment_reference"],
    "VAT" => &["vat_id_number", "tax_authority", "reporting_period", "submission_deadline", "tax_due_amount", "form_name"],
    "LEGAL" => &["contract_parties", "effective_date", "expiration_date", "renewal_terms"],
    "REGISTRATION" => &["company_name", "registration_number", "issuing_authority", "date_of_issue"],
    "FINANCIAL" => &["account_balance", "transaction_summary", "financial_period", "bank_name"],
    "INSURANCE" => &["policy_number", "coverage_type", "premium_amount", "renewal_date", "insurer_name"],
    "CERTIFICATES" => &["certificate_type", "issuing_authority", "validity_period", "certificate_number"],
    "TAX" => &["tax_type", "tax_period", "tax_amount", "filing_deadline", "tax_authority"],
    "GENERAL" => &["sender_name", "subject", "contact_person", "relevant_dates"],
};

/// Expected key-detail fields for a category; empty for UNCLASSIFIABLE
pub fn field_hint(category: Category) -> &'static [&'static str] {
    CATEGORY_FIELDS
        .get(category.as_str())
        .copied()
        .unwrap_or(&[])
}

// ========== Builders ==========

/// System and user message for a single-document analysis
pub fn analysis_messages(text: &str, context: Option<&CategoryContext>) -> (&'static str, String) {
    let Some(context) = context else {
        return (SINGLE_DOCUMENT_PROMPT, text.to_string());
    };

    let category = context.category;
    let subcategory = context
        .subcategory
        .as_deref()
        .map(|s| format!(" (subcategory: {})", s))
        .unwrap_or_default();
    let user = format!(
        r#"You are analysing a document classified as {category}{subcategory}.

Document text:
{text}

Focus on {category}-specific details, requirements, deadlines and compliance issues.{fields}"#,
        fields = fields_line(field_hint(category)),
    );
    (ANALYSIS_PROMPT, user)
}

/// User message for the consolidated call
pub fn consolidation_message(request: &ConsolidationRequest) -> String {
    let file_info = serde_json::to_string_pretty(&request.file_info).unwrap_or_default();
    let category = request.dominant_category;
    let note = if request.categories.iter().any(|c| *c != category) {
        let mut distinct: Vec<&str> = Vec::new();
        for c in &request.categories {
            if !distinct.contains(&c.as_str()) {
                distinct.push(c.as_str());
            }
        }
        format!(
            "\nNote: the batch mixes categories ({}). Treat {} as the primary one.\n",
            distinct.join(", "),
            category
        )
    } else {
        String::new()
    };
    let sampled = if request.text_sample.chars().count() < request.original_length {
        format!(
            " The text was sampled from {} characters; the middle part is omitted.",
            request.original_length
        )
    } else {
        String::new()
    };

    format!(
        r#"You are analysing {count} documents classified as {category}.
{note}
Document information:
{file_info}

Provide a comprehensive summary, key findings, detailed recommendations and priority actions for the whole set.{sampled}

Combined text:
{text}

Focus on {category}-specific details, deadlines and compliance issues.{fields}"#,
        count = request.file_info.len(),
        text = request.text_sample,
        fields = fields_line(request.field_hint),
    )
}

fn fields_line(fields: &[&str]) -> String {
    if fields.is_empty() {
        return String::new();
    }
    format!("\nPut these fields in key_details when present: {}.", fields.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileInfo;

    #[test]
    fn every_category_but_unclassifiable_has_a_hint() {
        for category in Category::ALL {
            let hint = field_hint(category);
            if category == Category::Unclassifiable {
                assert!(hint.is_empty());
            } else {
                assert!(!hint.is_empty(), "{} has no field hint", category);
            }
        }
        assert!(field_hint(Category::Payments).contains(&"iban"));
    }

    #[test]
    fn unclassified_analysis_uses_single_document_prompt() {
        let (system, user) = analysis_messages("raw text", None);
        assert_eq!(system, SINGLE_DOCUMENT_PROMPT);
        assert_eq!(user, "raw text");
    }

    #[test]
    fn classified_analysis_names_category_and_fields() {
        let context = CategoryContext {
            category: Category::Vat,
            subcategory: Some("VAT Return Form".to_string()),
        };
        let (system, user) = analysis_messages("Q1 return", Some(&context));
        assert_eq!(system, ANALYSIS_PROMPT);
        assert!(user.contains("classified as VAT (subcategory: VAT Return Form)"));
        assert!(user.contains("vat_id_number"));
        assert!(user.contains("Q1 return"));
    }

    #[test]
    fn consolidation_message_flags_mixed_batches() {
        let request = ConsolidationRequest {
            text_sample: "A\n\n--- DOCUMENT SEPARATOR ---\n\nB".to_string(),
            original_length: 31,
            file_info: vec![
                FileInfo {
                    filename: "a.pdf".to_string(),
                    text_length: 1,
                    category: Category::Payments,
                },
                FileInfo {
                    filename: "b.pdf".to_string(),
                    text_length: 1,
                    category: Category::Legal,
                },
            ],
            categories: vec![Category::Payments, Category::Legal],
            dominant_category: Category::Payments,
            field_hint: field_hint(Category::Payments),
        };
        let message = consolidation_message(&request);
        assert!(message.contains("analysing 2 documents classified as PAYMENTS"));
        assert!(message.contains("mixes categories (PAYMENTS, LEGAL)"));
        assert!(message.contains("\"filename\": \"a.pdf\""));
        assert!(message.contains("payment_reference"));
        assert!(!message.contains("sampled"));
    }
}
