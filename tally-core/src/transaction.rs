//! Transaction records produced by the pipeline

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A candidate transaction matched on a single statement line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawTransaction {
    /// `MM/DD` exactly as printed; statements omit the year
    pub date: String,
    /// Description with surrounding whitespace trimmed
    pub description: String,
    /// Amount as written; no debit/credit sign normalization
    pub amount: f64,
}

/// One categorized transaction returned by the model.
///
/// Every field is required. A reply missing any of them fails deserialization
/// and the whole extraction call is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    /// Transaction date as normalized by the model (free-form)
    pub date: String,
    pub description: String,
    /// Charges positive, payments and credits negative
    pub amount: f64,
    /// Usually "Debit" or "Credit", not enforced
    pub category: String,
    /// Semantic label such as "Groceries"
    pub subcategory: String,
    /// Semantic label such as "Household Expense"
    pub analysis: String,
}

/// The schema-validated reply of one extraction call.
///
/// Mirrors the wire shape `{ "data": [Statement, ...] }`. Built once by the
/// extraction client and only read afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractionResult {
    data: Vec<Statement>,
}

impl ExtractionResult {
    pub fn new(data: Vec<Statement>) -> Self {
        Self { data }
    }

    pub fn statements(&self) -> &[Statement] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Statement> {
        self.data.iter()
    }

    pub fn into_statements(self) -> Vec<Statement> {
        self.data
    }

    /// Sum of all amounts, charges minus credits under the prompt's sign convention
    pub fn net_amount(&self) -> f64 {
        self.data.iter().map(|s| s.amount).sum()
    }
}

impl<'a> IntoIterator for &'a ExtractionResult {
    type Item = &'a Statement;
    type IntoIter = std::slice::Iter<'a, Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_uses_pascal_case_fields() {
        let json = r#"{
            "Date": "01/02/22",
            "Description": "INSTACART HTTPSINSTACAR CA",
            "Amount": 183.53,
            "Category": "Debit",
            "Subcategory": "Groceries",
            "Analysis": "Household Expense"
        }"#;

        let s: Statement = serde_json::from_str(json).unwrap();
        assert_eq!(s.date, "01/02/22");
        assert_eq!(s.amount, 183.53);
        assert_eq!(s.subcategory, "Groceries");
    }

    #[test]
    fn test_statement_missing_field_is_rejected() {
        let json = r#"{
            "Date": "01/02/22",
            "Description": "INSTACART",
            "Amount": 183.53,
            "Category": "Debit",
            "Subcategory": "Groceries"
        }"#;

        let err = serde_json::from_str::<Statement>(json).unwrap_err();
        assert!(err.to_string().contains("Analysis"));
    }

    #[test]
    fn test_statement_string_amount_is_rejected() {
        let json = r#"{
            "Date": "01/02/22",
            "Description": "INSTACART",
            "Amount": "183.53",
            "Category": "Debit",
            "Subcategory": "Groceries",
            "Analysis": "Household Expense"
        }"#;

        assert!(serde_json::from_str::<Statement>(json).is_err());
    }

    #[test]
    fn test_extraction_result_net_amount() {
        let result: ExtractionResult = serde_json::from_str(
            r#"{"data": [
                {"Date": "01/02/22", "Description": "A", "Amount": 100.0,
                 "Category": "Debit", "Subcategory": "Food", "Analysis": "Dining"},
                {"Date": "01/03/22", "Description": "B", "Amount": -40.5,
                 "Category": "Credit", "Subcategory": "Refund", "Analysis": "Refund"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(result.len(), 2);
        assert!((result.net_amount() - 59.5).abs() < 1e-9);
        assert_eq!(result.iter().next().unwrap().description, "A");
    }

    #[test]
    fn test_raw_transaction_serializes_like_prompt_rows() {
        let raw = RawTransaction {
            date: "03/14".to_string(),
            description: "AMAZON.COM*AB12CD".to_string(),
            amount: 45.99,
        };
        let v = serde_json::to_value(&raw).unwrap();
        assert_eq!(v["Date"], "03/14");
        assert_eq!(v["Description"], "AMAZON.COM*AB12CD");
        assert_eq!(v["Amount"], 45.99);
    }
}
