/*!
 * End-to-end integration tests for the import pipeline
 *
 * Exercises discovery, parsing, and loading over temp-dir XML fixtures and
 * the in-memory store backend. No database is required.
 */

use std::fs;
use std::path::Path;

use medcodes::prelude::*;
use medcodes::schema::SqlValue;

const DIAGNOSIS_FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ICD10CM.tabular>
  <chapter>
    <name>9</name>
    <desc>Circulatory</desc>
    <diag>
      <name>I10</name>
      <desc>Essential hypertension</desc>
    </diag>
    <diag>
      <name>I21</name>
      <desc>Acute myocardial infarction</desc>
      <diag>
        <name>I21.0</name>
        <desc>ST elevation myocardial infarction of anterior wall</desc>
      </diag>
    </diag>
  </chapter>
</ICD10CM.tabular>"#;

const PROCEDURE_FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ICD10PCS.tabular>
  <pcsTable>
    <axis pos="1" values="1">
      <title>Section</title>
      <label code="0">Medical and Surgical</label>
    </axis>
    <axis pos="2" values="1">
      <title>Body System</title>
      <label code="2">Heart and Great Vessels</label>
    </axis>
    <axis pos="3" values="1">
      <title>Operation</title>
      <label code="1">Bypass</label>
      <definition>Altering the route of passage of the contents of a tubular body part</definition>
    </axis>
  </pcsTable>
  <pcsTable>
    <axis pos="1" values="1">
      <title>Section</title>
      <label code="0">Medical and Surgical</label>
    </axis>
    <axis pos="2" values="1">
      <title>Body System</title>
      <label code="2">Heart and Great Vessels</label>
    </axis>
    <axis pos="3" values="1">
      <title>Operation</title>
      <label code="1">Bypass</label>
    </axis>
  </pcsTable>
</ICD10PCS.tabular>"#;

fn write_fixtures(dir: &Path) {
    fs::write(dir.join("icd10cm_tabular_2024.xml"), DIAGNOSIS_FIXTURE).unwrap();
    fs::write(dir.join("icd10pcs_tables_tabular_2024.xml"), PROCEDURE_FIXTURE).unwrap();
}

fn test_reader() -> CodeReader {
    #[cfg(feature = "progress")]
    {
        CodeReader::new().with_progress_bar(false)
    }
    #[cfg(not(feature = "progress"))]
    {
        CodeReader::new()
    }
}

fn stored_description(store: &MemoryStore, schema: &TableSchema, code: &str) -> String {
    let row = store
        .get(schema, code)
        .unwrap_or_else(|| panic!("expected a row for code '{}'", code));
    match &row.values[1] {
        SqlValue::Text(text) => text.clone(),
        other => panic!("unexpected description value {:?}", other),
    }
}

#[test]
fn test_full_import_populates_all_tables() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(dir.path());

    let mut store = MemoryStore::new();
    store.ensure_tables().unwrap();

    let options = ImportOptions::new(dir.path());
    let summary = run_import(&options, &test_reader(), Some(&mut store)).unwrap();

    assert_eq!(summary.diagnosis_files, 1);
    assert_eq!(summary.procedure_files, 1);
    // nested entries each count; the duplicate procedure table does not
    assert_eq!(summary.diagnosis_parsed, 3);
    assert_eq!(summary.procedure_parsed, 1);
    assert_eq!(summary.diagnosis_loaded, 3);
    assert_eq!(summary.procedure_loaded, 1);

    let counts = summary.table_counts.unwrap();
    // 3 XML-derived diagnoses + seed list, minus the I10 overlap
    let expected_diagnoses = 3 + common_diagnosis_codes().len() as u64 - 1;
    assert_eq!(counts.diagnosis, expected_diagnoses);
    assert_eq!(counts.diagnosis, store.count(&DIAGNOSIS_TABLE).unwrap());
    assert_eq!(counts.procedure, 1);
    assert_eq!(counts.billing, common_billing_concepts().len() as u64);

    // seed insert-if-absent must not clobber the XML-derived description
    assert_eq!(
        stored_description(&store, &DIAGNOSIS_TABLE, "I10"),
        "Essential hypertension"
    );
}

#[test]
fn test_import_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(dir.path());

    let mut store = MemoryStore::new();
    store.ensure_tables().unwrap();

    let options = ImportOptions::new(dir.path());
    let first = run_import(&options, &test_reader(), Some(&mut store)).unwrap();
    let second = run_import(&options, &test_reader(), Some(&mut store)).unwrap();

    let first_counts = first.table_counts.unwrap();
    let second_counts = second.table_counts.unwrap();
    assert_eq!(first_counts.diagnosis, second_counts.diagnosis);
    assert_eq!(first_counts.procedure, second_counts.procedure);
    assert_eq!(first_counts.billing, second_counts.billing);
}

#[test]
fn test_chapter_without_section_layer() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("icd10cm_tabular_2026.xml"),
        r#"<root><chapter><desc>Circulatory</desc>
           <diag><name>I10</name><desc>Essential hypertension</desc></diag>
           </chapter></root>"#,
    )
    .unwrap();

    let reader = test_reader();
    let codes = reader
        .load_diagnosis_codes(dir.path().join("icd10cm_tabular_2026.xml"))
        .unwrap();

    assert_eq!(codes.len(), 1);
    assert_eq!(codes[0].chapter_name, "Circulatory");
    assert_eq!(codes[0].section_name, None);
    assert_eq!(codes[0].category, "I10");
}

#[test]
fn test_procedure_axis_synthesis_and_dedup() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(dir.path());

    let reader = test_reader();
    let codes = reader
        .load_procedure_codes(dir.path().join("icd10pcs_tables_tabular_2024.xml"))
        .unwrap();

    // two tables, one synthesized description: the loader receives one record
    assert_eq!(codes.len(), 1);
    assert_eq!(codes[0].description, "Bypass - Heart and Great Vessels");
    assert_eq!(codes[0].operation_name, "Bypass");
}

#[test]
fn test_repeated_seed_insert_yields_single_row() {
    let mut store = MemoryStore::new();
    store.ensure_tables().unwrap();

    let record = DiagnosisCode::new(
        IcdCode::new("I10".to_string()).unwrap(),
        "Essential hypertension".to_string(),
        "Cardiovascular",
        None,
    );
    let rows = vec![record.to_row()];

    load_records(&mut store, &DIAGNOSIS_TABLE, &rows, ConflictAction::Update);
    load_records(&mut store, &DIAGNOSIS_TABLE, &rows, ConflictAction::Update);

    assert_eq!(store.count(&DIAGNOSIS_TABLE).unwrap(), 1);
    assert_eq!(
        stored_description(&store, &DIAGNOSIS_TABLE, "I10"),
        "Essential hypertension"
    );
}

#[test]
fn test_dry_run_reports_counts_without_writes() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(dir.path());

    let mut store = MemoryStore::new();
    store.ensure_tables().unwrap();

    let mut options = ImportOptions::new(dir.path());
    options.dry_run = true;
    let summary = run_import(&options, &test_reader(), None).unwrap();

    assert!(summary.diagnosis_parsed > 0);
    assert!(summary.procedure_parsed > 0);
    assert!(summary.table_counts.is_none());
    assert_eq!(store.count(&DIAGNOSIS_TABLE).unwrap(), 0);
    assert_eq!(store.count(&PROCEDURE_TABLE).unwrap(), 0);
    assert_eq!(store.count(&BILLING_TABLE).unwrap(), 0);
}

#[test]
fn test_mode_filters_restrict_processing() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(dir.path());

    let mut store = MemoryStore::new();
    store.ensure_tables().unwrap();

    let mut options = ImportOptions::new(dir.path());
    options.procedure_only = true;
    let summary = run_import(&options, &test_reader(), Some(&mut store)).unwrap();

    assert_eq!(summary.diagnosis_parsed, 0);
    assert_eq!(summary.procedure_loaded, 1);
    // mode filters also skip the seed step
    assert_eq!(store.count(&BILLING_TABLE).unwrap(), 0);
    assert_eq!(store.count(&DIAGNOSIS_TABLE).unwrap(), 0);
}

#[test]
fn test_malformed_file_is_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(dir.path());
    fs::write(
        dir.path().join("icd10cm_tabular_broken.xml"),
        "<root><chapter><desc>Broken</desc></section></root>",
    )
    .unwrap();

    let mut store = MemoryStore::new();
    store.ensure_tables().unwrap();

    let options = ImportOptions::new(dir.path());
    let summary = run_import(&options, &test_reader(), Some(&mut store)).unwrap();

    // the malformed file contributes zero records, the good one still loads
    assert_eq!(summary.diagnosis_files, 2);
    assert_eq!(summary.diagnosis_parsed, 3);
    assert_eq!(summary.diagnosis_loaded, 3);
}
