/*!
 * Code shape validation and category derivation
 *
 * Pure functions deciding whether an extracted string is a well-formed
 * ICD-10-CM diagnosis code and deriving its 3-character category key.
 */

/// A candidate code that passed the shape check, with its derived category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCode {
    pub code: String,
    pub category: String,
}

/// Validate a candidate diagnosis code string.
///
/// A well-formed code is at least 3 characters and starts with an uppercase
/// letter, a digit, and a digit or uppercase letter (e.g. `I10`, `S72.001A`).
/// Only the first three characters are checked against the shape; suffix
/// characters vary by chapter and are accepted as-is.
///
/// Returns `None` for malformed candidates. Rejections are expected,
/// normal filtering of non-code tokens in the tabular source and are not
/// reported as errors.
pub fn validate_diagnosis_code(raw: &str) -> Option<ValidatedCode> {
    if raw.len() < 3 || !has_code_shape(raw) {
        return None;
    }
    Some(ValidatedCode {
        code: raw.to_string(),
        category: derive_category(raw).to_string(),
    })
}

/// Derive the category key: always the first three characters.
///
/// This is a deterministic slice, not a lookup. It also holds for codes
/// shorter than expected (the whole string is returned); callers that need
/// a full category must validate length first.
pub fn derive_category(code: &str) -> &str {
    let end = code
        .char_indices()
        .nth(3)
        .map(|(i, _)| i)
        .unwrap_or(code.len());
    &code[..end]
}

/// Check the leading letter-digit-(digit|letter) shape.
fn has_code_shape(code: &str) -> bool {
    let mut chars = code.chars();
    let (Some(first), Some(second), Some(third)) = (chars.next(), chars.next(), chars.next())
    else {
        return false;
    };
    first.is_ascii_uppercase()
        && second.is_ascii_digit()
        && (third.is_ascii_digit() || third.is_ascii_uppercase())
}
