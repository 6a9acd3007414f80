/*!
 * Error handling for medical code import operations
 *
 * Provides detailed error types with context, suggestions, and recovery guidance.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Medical codes library result type
pub type Result<T> = std::result::Result<T, MedCodesError>;

/// Error types with context and suggestions
#[derive(Error, Debug)]
pub enum MedCodesError {
    /// File I/O errors with context
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
        context: ErrorContext,
    },

    /// Failed to establish a session with the target store.
    ///
    /// Fatal: a run that cannot reach the store aborts before any parsing.
    #[error("Store connection failed: {message}")]
    Connection {
        message: String,
        suggestion: Option<String>,
    },

    /// Malformed XML source document. Scoped to a single file; the
    /// orchestrator skips the file and continues with the rest.
    #[error("XML parse error in {file}: {message}")]
    XmlParse {
        message: String,
        file: PathBuf,
        position: Option<u64>,
    },

    /// Data validation errors with detailed information
    #[error("Data validation error: {message}")]
    DataValidation {
        message: String,
        field: Option<String>,
        value: Option<String>,
        context: ErrorContext,
    },

    /// A single insert/update failed. Scoped to one record; the loader
    /// logs the offending code and continues with the batch.
    #[error("Store write error for code '{code}': {message}")]
    StoreWrite {
        code: String,
        message: String,
    },

    /// File not found with suggestions
    #[error("File not found: {path}")]
    FileNotFound {
        path: PathBuf,
        suggestion: String,
    },

    /// Invalid diagnosis code with format guidance
    #[error("Invalid diagnosis code '{code}': {reason}")]
    InvalidCode {
        code: String,
        reason: String,
        suggestion: String,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        suggestion: Option<String>,
    },

    /// Generic errors with custom message
    #[error("{message}")]
    Custom {
        message: String,
        suggestion: Option<String>,
    },
}

/// Error context providing additional information
#[derive(Debug, Default, Clone)]
pub struct ErrorContext {
    pub file_path: Option<PathBuf>,
    pub line_number: Option<usize>,
    pub record_code: Option<String>,
}

impl MedCodesError {
    /// Create a file not found error with helpful suggestion
    pub fn file_not_found_with_suggestion(path: PathBuf) -> Self {
        let name = path.to_string_lossy().to_lowercase();
        let suggestion = if name.contains("icd10cm") {
            format!(
                "Check if the file exists at '{}'. CMS tabular releases follow the pattern \
                'icd10cm_tabular_YYYY.xml' and can be downloaded from https://www.cms.gov/medicare/coding-billing/icd-10-codes",
                path.display()
            )
        } else if name.contains("icd10pcs") {
            format!(
                "Check if the file exists at '{}'. CMS PCS tables follow the pattern \
                'icd10pcs_tables_YYYY.xml' and can be downloaded from https://www.cms.gov/medicare/coding-billing/icd-10-codes",
                path.display()
            )
        } else {
            format!(
                "Check if the file exists at '{}'. Make sure the path is correct and you have read permissions.",
                path.display()
            )
        };

        Self::FileNotFound { path, suggestion }
    }

    /// Create an invalid diagnosis code error with validation details
    pub fn invalid_code(code: &str) -> Self {
        let (reason, suggestion) = if code.is_empty() {
            ("code cannot be empty".to_string(),
             "Provide a code of at least 3 characters".to_string())
        } else if code.len() < 3 {
            (format!("code must be at least 3 characters, found {}", code.len()),
             "ICD-10 codes start with a 3-character category, e.g. 'I10'".to_string())
        } else {
            ("code must start with an uppercase letter, a digit, and a digit or uppercase letter".to_string(),
             "Verify the code against the ICD-10-CM tabular index".to_string())
        };

        Self::InvalidCode {
            code: code.to_string(),
            reason,
            suggestion,
        }
    }

    /// Create a fatal store connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: Some(
                "Check the MEDCODES_DB_* environment variables or the [store] section of the config file".to_string(),
            ),
        }
    }

    /// Whether this error should abort the entire run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            Self::FileNotFound { suggestion, .. } => {
                format!("{}\n\nSuggestion: {}", self, suggestion)
            }
            Self::InvalidCode { suggestion, .. } => {
                format!("{}\n\nSuggestion: {}", self, suggestion)
            }
            Self::Connection { suggestion: Some(sug), .. } => {
                format!("{}\n\nSuggestion: {}", self, sug)
            }
            Self::Configuration { suggestion: Some(sug), .. } => {
                format!("{}\n\nSuggestion: {}", self, sug)
            }
            Self::Custom { suggestion: Some(sug), .. } => {
                format!("{}\n\nSuggestion: {}", self, sug)
            }
            _ => self.to_string(),
        }
    }
}

// Convenience conversions
impl From<std::io::Error> for MedCodesError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: err,
            context: ErrorContext::default(),
        }
    }
}

impl From<postgres::Error> for MedCodesError {
    fn from(err: postgres::Error) -> Self {
        Self::Custom {
            message: format!("Database error: {}", err),
            suggestion: None,
        }
    }
}
