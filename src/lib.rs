/*!
 * # Medical Coding Reference Data Import Library
 *
 * A Rust library for loading official medical coding reference data into
 * normalized PostgreSQL lookup tables for claims processing.
 *
 * ## Features
 *
 * - **Streaming XML parsing**: single-pass traversal of CMS ICD-10-CM
 *   tabular hierarchies and ICD-10-PCS table structures
 * - **Normalized records**: flat, validated diagnosis and procedure records
 *   with derived category keys
 * - **Idempotent loading**: insert-or-update keyed on each table's unique
 *   code, tolerant of per-record failure
 * - **Seed codes**: a hand-authored list of common diagnosis and billing
 *   codes loaded alongside every full import
 * - **Dry runs**: parse and count without touching the store
 *
 * ## Quick Start
 *
 * ```no_run
 * use medcodes::prelude::*;
 *
 * # fn main() -> Result<()> {
 * let config = Config::load();
 * let mut store = PostgresStore::connect(&config.store)?;
 * store.ensure_tables()?;
 *
 * let reader = CodeReader::new();
 * let options = ImportOptions::new(&config.data_dir);
 * let summary = run_import(&options, &reader, Some(&mut store))?;
 * summary.print_summary();
 * # Ok(())
 * # }
 * ```
 *
 * ## Parsing Without a Store
 *
 * ```no_run
 * # use medcodes::prelude::*;
 * # fn main() -> Result<()> {
 * let reader = CodeReader::new();
 * let codes = reader.load_diagnosis_codes("data/icd10cm_tabular_2024.xml")?;
 * println!("parsed {} diagnosis codes", codes.len());
 * # Ok(())
 * # }
 * ```
 *
 * ## Source Files
 *
 * The importer discovers CMS release files by name:
 *
 * - **ICD-10-CM tabular**: filename contains `icd10cm` and `tabular`
 * - **ICD-10-PCS tables**: filename contains `icd10pcs` and `tabular`
 *
 * Download releases from: https://www.cms.gov/medicare/coding-billing/icd-10-codes
 */

// Re-export error types from root
pub use error::{ErrorContext, MedCodesError, Result};

// Public modules
pub mod config;
pub mod data_types;
pub mod error;
pub mod import;
pub mod reader;
pub mod schema;
pub mod seed;
pub mod store;
pub mod validate;

/// Prelude module for convenient imports
///
/// Import everything you need with:
/// ```
/// use medcodes::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{Config, ConfigBuilder, StoreConfig};
    pub use crate::data_types::*;
    pub use crate::error::{MedCodesError, Result};
    pub use crate::import::{discover_files, run_import, ImportOptions, ImportSummary};
    pub use crate::reader::CodeReader;
    pub use crate::schema::{ConflictAction, TableSchema, ALL_TABLES, BILLING_TABLE, DIAGNOSIS_TABLE, PROCEDURE_TABLE};
    pub use crate::seed::{common_billing_concepts, common_diagnosis_codes, load_seed_codes};
    pub use crate::store::{load_records, CodeStore, MemoryStore, PostgresStore};
    pub use crate::validate::{derive_category, validate_diagnosis_code};
}

/// Pipeline constants
pub mod constants {
    /// Filename marker identifying diagnosis-system release files
    pub const DIAGNOSIS_FILE_MARKER: &str = "icd10cm";

    /// Filename marker identifying procedure-system release files
    pub const PROCEDURE_FILE_MARKER: &str = "icd10pcs";

    /// Filename marker identifying tabular (as opposed to index) releases
    pub const TABULAR_FILE_MARKER: &str = "tabular";

    /// Chapter label used until the first chapter description is seen
    pub const UNKNOWN_CHAPTER: &str = "Unknown Chapter";

    /// Section label for sections without a description
    pub const UNKNOWN_SECTION: &str = "Unknown Section";

    /// Body-system label for tables without a position-2 axis
    pub const UNKNOWN_BODY_SYSTEM: &str = "Unknown Body System";

    /// Operation label for tables without a position-3 axis
    pub const UNKNOWN_OPERATION: &str = "Unknown Operation";

    /// Description substituted when a diagnosis entry has no text
    pub const NO_DESCRIPTION: &str = "No description";
}

#[cfg(test)]
mod tests {
    use crate::data_types::IcdCode;
    use crate::validate::validate_diagnosis_code;

    #[test]
    fn test_code_validation() {
        assert!(IcdCode::new("I10".to_string()).is_ok());
        assert!(IcdCode::new("I1".to_string()).is_err());
        assert!(IcdCode::new("110".to_string()).is_err());
    }

    #[test]
    fn test_category_derivation() {
        let validated = validate_diagnosis_code("E11.9").unwrap();
        assert_eq!(validated.category, "E11");
    }
}
