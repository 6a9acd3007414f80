/*!
 * Import orchestration: discovery, mode filters, and the batch run
 *
 * Ties the readers and the store together into one strictly sequential
 * batch job: each file is fully parsed, and its records fully loaded,
 * before the next file begins. Parse failures are file-scoped and never
 * reach the loader.
 */

use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{DIAGNOSIS_FILE_MARKER, PROCEDURE_FILE_MARKER, TABULAR_FILE_MARKER};
use crate::reader::CodeReader;
use crate::schema::{ConflictAction, BILLING_TABLE, DIAGNOSIS_TABLE, PROCEDURE_TABLE};
use crate::seed::load_seed_codes;
use crate::store::{load_records, CodeStore};
use crate::Result;

/// Options for one import run
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Root directory searched recursively for release files
    pub data_dir: PathBuf,
    /// Parse and report counts without touching the store
    pub dry_run: bool,
    /// Process only diagnosis sources (also skips the seed step)
    pub diagnosis_only: bool,
    /// Process only procedure sources
    pub procedure_only: bool,
}

impl ImportOptions {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            dry_run: false,
            diagnosis_only: false,
            procedure_only: false,
        }
    }
}

/// Candidate source files found under the data directory
#[derive(Debug, Default)]
pub struct DiscoveredFiles {
    pub diagnosis: Vec<PathBuf>,
    pub procedure: Vec<PathBuf>,
}

impl DiscoveredFiles {
    pub fn is_empty(&self) -> bool {
        self.diagnosis.is_empty() && self.procedure.is_empty()
    }
}

/// Recursively discover release files under a root directory.
///
/// A file is a diagnosis candidate if its lowercased name carries the
/// diagnosis-system marker and the tabular marker; a procedure candidate
/// if it carries the procedure-system marker and the tabular marker. Only
/// `.xml` files match; everything else is ignored.
pub fn discover_files(root: &Path) -> Result<DiscoveredFiles> {
    let mut found = DiscoveredFiles::default();
    if !root.is_dir() {
        return Err(crate::MedCodesError::Custom {
            message: format!("'{}' is not a directory", root.display()),
            suggestion: Some("Provide a directory containing CMS XML release files".to_string()),
        });
    }
    walk(root, &mut found)?;
    found.diagnosis.sort();
    found.procedure.sort();
    Ok(found)
}

fn walk(dir: &Path, found: &mut DiscoveredFiles) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk(&path, found)?;
            continue;
        }
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_lowercase(),
            None => continue,
        };
        if !name.ends_with(".xml") || !name.contains(TABULAR_FILE_MARKER) {
            continue;
        }
        if name.contains(DIAGNOSIS_FILE_MARKER) {
            found.diagnosis.push(path);
        } else if name.contains(PROCEDURE_FILE_MARKER) {
            found.procedure.push(path);
        }
    }
    Ok(())
}

/// Row counts observed in the store after a run
#[derive(Debug, Clone, Copy, Default)]
pub struct TableCounts {
    pub diagnosis: u64,
    pub procedure: u64,
    pub billing: u64,
}

impl TableCounts {
    pub fn total(&self) -> u64 {
        self.diagnosis + self.procedure + self.billing
    }
}

/// Aggregate counts from one import run
#[derive(Debug, Default)]
pub struct ImportSummary {
    pub diagnosis_files: usize,
    pub procedure_files: usize,
    pub diagnosis_parsed: usize,
    pub procedure_parsed: usize,
    pub diagnosis_loaded: usize,
    pub procedure_loaded: usize,
    pub seed_diagnosis_loaded: usize,
    pub seed_billing_loaded: usize,
    pub dry_run: bool,
    /// Absent on dry runs
    pub table_counts: Option<TableCounts>,
}

impl ImportSummary {
    /// Print the run-end summary: per-table counts, no stack traces
    pub fn print_summary(&self) {
        println!();
        println!("Import Summary");
        println!("==============");
        println!(
            "Source files: {} diagnosis, {} procedure",
            self.diagnosis_files, self.procedure_files
        );
        println!(
            "Parsed: {} diagnosis codes, {} procedure concepts",
            self.diagnosis_parsed, self.procedure_parsed
        );
        if self.dry_run {
            println!("Dry run: no records written");
            return;
        }
        println!(
            "Loaded: {} diagnosis codes, {} procedure concepts, {} seed codes",
            self.diagnosis_loaded,
            self.procedure_loaded,
            self.seed_diagnosis_loaded + self.seed_billing_loaded
        );
        if let Some(counts) = self.table_counts {
            println!("Diagnosis codes in store:  {}", counts.diagnosis);
            println!("Procedure codes in store:  {}", counts.procedure);
            println!("Billing concepts in store: {}", counts.billing);
            println!("Total medical codes:       {}", counts.total());
        }
    }
}

/// Run one import over a discovered set of files.
///
/// `store` is `None` exactly when `options.dry_run` is set; files are
/// processed one at a time, parse errors are logged and skipped, and the
/// seed step runs last (insert-if-absent, so XML-derived rows win).
pub fn run_import(
    options: &ImportOptions,
    reader: &CodeReader,
    mut store: Option<&mut dyn CodeStore>,
) -> Result<ImportSummary> {
    let files = discover_files(&options.data_dir)?;
    println!(
        "Found {} diagnosis file(s) and {} procedure file(s) under {}",
        files.diagnosis.len(),
        files.procedure.len(),
        options.data_dir.display()
    );
    if files.is_empty() {
        log::warn!("no matching release files under {}", options.data_dir.display());
    }

    let mut summary = ImportSummary {
        diagnosis_files: files.diagnosis.len(),
        procedure_files: files.procedure.len(),
        dry_run: options.dry_run,
        ..ImportSummary::default()
    };

    if !options.procedure_only {
        for path in &files.diagnosis {
            match reader.load_diagnosis_codes(path) {
                Ok(codes) => {
                    summary.diagnosis_parsed += codes.len();
                    if let Some(store) = store.as_deref_mut() {
                        let rows: Vec<_> = codes.iter().map(|c| c.to_row()).collect();
                        summary.diagnosis_loaded += load_records(
                            store,
                            &DIAGNOSIS_TABLE,
                            &rows,
                            ConflictAction::Update,
                        );
                    }
                }
                Err(e) => log::error!("skipping file: {}", e),
            }
        }
    }

    if !options.diagnosis_only {
        for path in &files.procedure {
            match reader.load_procedure_codes(path) {
                Ok(codes) => {
                    summary.procedure_parsed += codes.len();
                    if let Some(store) = store.as_deref_mut() {
                        let rows: Vec<_> = codes.iter().map(|c| c.to_row()).collect();
                        summary.procedure_loaded += load_records(
                            store,
                            &PROCEDURE_TABLE,
                            &rows,
                            ConflictAction::Update,
                        );
                    }
                }
                Err(e) => log::error!("skipping file: {}", e),
            }
        }
    }

    // seed codes ride along with every full import
    if !options.diagnosis_only && !options.procedure_only {
        if let Some(store) = store.as_deref_mut() {
            let (seed_diagnosis, seed_billing) =
                load_seed_codes(store, ConflictAction::Nothing);
            summary.seed_diagnosis_loaded = seed_diagnosis;
            summary.seed_billing_loaded = seed_billing;
        }
    }

    if let Some(store) = store.as_deref_mut() {
        summary.table_counts = Some(TableCounts {
            diagnosis: store.count(&DIAGNOSIS_TABLE)?,
            procedure: store.count(&PROCEDURE_TABLE)?,
            billing: store.count(&BILLING_TABLE)?,
        });
    }

    Ok(summary)
}
