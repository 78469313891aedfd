//! Prompts for statement categorization

use tally_core::RawTransaction;

pub const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that extracts structured data from text.";

/// Name attached to the output schema in the request
pub const SCHEMA_NAME: &str = "statement_extraction";

const EXAMPLE_RECORDS: &str = r#"{
  "data": [
    {
      "Date": "01/02/22",
      "Description": "INSTACART HTTPSINSTACAR CA",
      "Amount": 183.53,
      "Category": "Debit",
      "Subcategory": "Groceries",
      "Analysis": "Household Expense"
    },
    {
      "Date": "12/28/21",
      "Description": "Payment Thank You - Web",
      "Amount": -15925.89,
      "Category": "Credit",
      "Subcategory": "Payment",
      "Analysis": "Credit Card Payment"
    },
    {
      "Date": "01/10/22",
      "Description": "DOORDASH*TROPICAL SMOO WWW.DOORDASH. CA",
      "Amount": 72.19,
      "Category": "Debit",
      "Subcategory": "Food",
      "Analysis": "Dining In"
    }
  ]
}"#;

/// Build the user instruction for one statement.
///
/// `statement_kind` is a free-text label ("bank", "Credit Card") that only
/// steers the wording.
pub fn user_prompt(statement_kind: &str, content: &str) -> String {
    format!(
        "Extract the structured data from the following {statement_kind} statement text. \
Categories should include any common descriptions useful for financial analysis and \
personal financial management.\n\
\n\
Every record must have all six fields: Date, Description, Amount (a number), Category, \
Subcategory and Analysis. Use a positive Amount for purchases, fees and other debits and \
a negative Amount for payments, refunds and other credits.\n\
\n\
Provide the data in this JSON format:\n\
\n\
{EXAMPLE_RECORDS}\n\
\n\
Text:\n\
{content}\n"
    )
}

/// Render candidate rows as the text embedded in the prompt.
pub fn render_candidates(candidates: &[RawTransaction]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(candidates)
}

/// Follow-up message asking the model to repair a reply that failed validation.
pub fn repair_prompt(validation_error: &str) -> String {
    format!(
        "Your previous reply did not match the required JSON schema: {validation_error}. \
Reply again with the complete corrected JSON object only."
    )
}
