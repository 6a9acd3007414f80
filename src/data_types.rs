/*!
 * Data type definitions for medical code records
 *
 * This module contains type-safe representations of the normalized records
 * produced by the parsers and consumed by the upsert loader. Each record is
 * a transient value: produced once by a parser, consumed exactly once by the
 * loader.
 */

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::schema::{Row, SqlValue};

/// Maximum stored length for chapter and section labels
pub const MAX_LABEL_LEN: usize = 255;

/// ICD-10-CM diagnosis code identifier, validated on construction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IcdCode(pub String);

impl IcdCode {
    /// Create a new code, validating the leading letter-digit-(digit|letter)
    /// shape and minimum length
    pub fn new(code: String) -> Result<Self, crate::MedCodesError> {
        if crate::validate::validate_diagnosis_code(&code).is_none() {
            return Err(crate::MedCodesError::invalid_code(&code));
        }
        Ok(IcdCode(code))
    }

    /// Get the code as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 3-character category key
    pub fn category(&self) -> &str {
        crate::validate::derive_category(&self.0)
    }
}

impl std::fmt::Display for IcdCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Normalized ICD-10-CM diagnosis record
///
/// One record per tabular `<diag>` entry. `category` is always the first
/// three characters of `code`; chapter and section labels are truncated to
/// the stored column width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisCode {
    pub code: IcdCode,
    pub description: String,
    pub chapter_name: String,
    pub section_name: Option<String>,
    pub category: String,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
}

impl DiagnosisCode {
    /// Build a record from extracted tabular fields, deriving the category
    /// and truncating labels
    pub fn new(
        code: IcdCode,
        description: String,
        chapter_name: &str,
        section_name: Option<&str>,
    ) -> Self {
        let category = code.category().to_string();
        Self {
            code,
            description,
            chapter_name: truncate_label(chapter_name),
            section_name: section_name.map(truncate_label),
            category,
            valid_from: None,
            valid_to: None,
        }
    }

    /// Values in `DIAGNOSIS_TABLE` field order
    pub fn to_row(&self) -> Row {
        Row::new(vec![
            SqlValue::Text(self.code.as_str().to_string()),
            SqlValue::Text(self.description.clone()),
            SqlValue::OptText(Some(self.chapter_name.clone())),
            SqlValue::OptText(self.section_name.clone()),
            SqlValue::OptText(Some(self.category.clone())),
            SqlValue::Date(self.valid_from),
            SqlValue::Date(self.valid_to),
        ])
    }
}

/// Normalized ICD-10-PCS procedure concept
///
/// One record per PCS table, derived from the table's positional axes.
/// `code` is a synthesized 7-character identifier whose leading character
/// encodes the PCS section and whose remainder is a digest of the axis
/// tuple. It is stable and unique per concept but is NOT a real,
/// addressable ICD-10-PCS procedure code: the source tables are not
/// expanded into their full combinatorial code space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureCode {
    pub code: String,
    pub description: String,
    pub section_name: String,
    pub body_system: String,
    pub operation_name: String,
    pub operation_definition: Option<String>,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
}

impl ProcedureCode {
    /// Values in `PROCEDURE_TABLE` field order
    pub fn to_row(&self) -> Row {
        Row::new(vec![
            SqlValue::Text(self.code.clone()),
            SqlValue::Text(self.description.clone()),
            SqlValue::OptText(Some(truncate_label(&self.section_name))),
            SqlValue::OptText(Some(truncate_label(&self.body_system))),
            SqlValue::OptText(Some(truncate_label(&self.operation_name))),
            SqlValue::OptText(self.operation_definition.clone()),
            SqlValue::Date(self.valid_from),
            SqlValue::Date(self.valid_to),
        ])
    }
}

/// Seed billing concept (CPT-style), statically enumerated rather than
/// derived from XML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingConcept {
    pub code: String,
    pub description: String,
    pub category: String,
    pub rvu: Option<f64>,
}

impl BillingConcept {
    /// Values in `BILLING_TABLE` field order
    pub fn to_row(&self) -> Row {
        Row::new(vec![
            SqlValue::Text(self.code.clone()),
            SqlValue::Text(self.description.clone()),
            SqlValue::OptText(Some(truncate_label(&self.category))),
            SqlValue::Double(self.rvu),
        ])
    }
}

/// Truncate a free-text label to the stored column width, on a char boundary
fn truncate_label(label: &str) -> String {
    if label.len() <= MAX_LABEL_LEN {
        return label.to_string();
    }
    let mut end = MAX_LABEL_LEN;
    while !label.is_char_boundary(end) {
        end -= 1;
    }
    label[..end].to_string()
}
