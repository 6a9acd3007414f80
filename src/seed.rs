/*!
 * Hand-authored seed code lists
 *
 * Essential diagnosis and billing codes that are commonly used in
 * healthcare claims, loaded independently of any XML release. These are
 * static literals, not derived data.
 */

use crate::data_types::{BillingConcept, DiagnosisCode, IcdCode};
use crate::schema::{ConflictAction, BILLING_TABLE, DIAGNOSIS_TABLE};
use crate::store::{load_records, CodeStore};

/// (code, description, chapter) for commonly billed ICD-10-CM diagnoses
const COMMON_DIAGNOSES: &[(&str, &str, &str)] = &[
    // Health encounters
    ("Z00.00", "Encounter for general adult medical examination without abnormal findings", "Health encounters"),
    ("Z00.01", "Encounter for general adult medical examination with abnormal findings", "Health encounters"),
    ("Z12.11", "Encounter for screening for malignant neoplasm of colon", "Health encounters"),
    ("Z51.11", "Encounter for antineoplastic chemotherapy", "Health encounters"),
    // Common conditions
    ("I10", "Essential hypertension", "Cardiovascular"),
    ("E11.9", "Type 2 diabetes mellitus without complications", "Endocrine"),
    ("J44.1", "Chronic obstructive pulmonary disease with acute exacerbation", "Respiratory"),
    ("M79.3", "Panniculitis, unspecified", "Musculoskeletal"),
    ("F32.9", "Major depressive disorder, single episode, unspecified", "Mental health"),
    // Injuries
    ("S72.001A", "Fracture of unspecified part of neck of right femur, initial encounter", "Injuries"),
    ("S06.0X0A", "Concussion without loss of consciousness, initial encounter", "Injuries"),
    ("T14.90XA", "Injury, unspecified, initial encounter", "Injuries"),
    // Symptoms
    ("R50.9", "Fever, unspecified", "Symptoms"),
    ("R06.02", "Shortness of breath", "Symptoms"),
    ("R10.9", "Abdominal pain, unspecified", "Symptoms"),
    ("K59.00", "Constipation, unspecified", "Digestive"),
    // Pregnancy
    ("O80", "Encounter for full-term uncomplicated delivery", "Pregnancy"),
    ("Z34.90", "Encounter for supervision of normal pregnancy, unspecified trimester", "Pregnancy"),
    // Preventive care
    ("Z23", "Encounter for immunization", "Preventive"),
    ("Z71.3", "Dietary counseling and surveillance", "Preventive"),
];

/// (code, description, category) for commonly billed CPT procedures
const COMMON_BILLING: &[(&str, &str, &str)] = &[
    // Evaluation & Management
    ("99201", "Office/outpatient visit, new patient, straightforward", "Evaluation and Management"),
    ("99202", "Office/outpatient visit, new patient, low complexity", "Evaluation and Management"),
    ("99203", "Office/outpatient visit, new patient, moderate complexity", "Evaluation and Management"),
    ("99211", "Office/outpatient visit, established patient, minimal", "Evaluation and Management"),
    ("99212", "Office/outpatient visit, established patient, straightforward", "Evaluation and Management"),
    ("99213", "Office/outpatient visit, established patient, low complexity", "Evaluation and Management"),
    ("99214", "Office/outpatient visit, established patient, moderate complexity", "Evaluation and Management"),
    ("99215", "Office/outpatient visit, established patient, high complexity", "Evaluation and Management"),
    // Emergency Medicine
    ("99281", "Emergency department visit, straightforward", "Emergency Medicine"),
    ("99282", "Emergency department visit, low complexity", "Emergency Medicine"),
    ("99283", "Emergency department visit, moderate complexity", "Emergency Medicine"),
    ("99284", "Emergency department visit, high complexity", "Emergency Medicine"),
    ("99285", "Emergency department visit, comprehensive", "Emergency Medicine"),
    // Preventive Medicine
    ("99385", "Initial comprehensive preventive medicine, 18-39 years", "Preventive Medicine"),
    ("99386", "Initial comprehensive preventive medicine, 40-64 years", "Preventive Medicine"),
    ("99395", "Periodic comprehensive preventive medicine, 18-39 years", "Preventive Medicine"),
    ("99396", "Periodic comprehensive preventive medicine, 40-64 years", "Preventive Medicine"),
    // Laboratory
    ("80053", "Comprehensive metabolic panel", "Laboratory"),
    ("80061", "Lipid panel", "Laboratory"),
    ("85025", "Complete blood count with differential", "Laboratory"),
    ("85610", "Prothrombin time", "Laboratory"),
    ("36415", "Routine venipuncture", "Laboratory"),
    ("87804", "Infectious agent detection by nucleic acid", "Laboratory"),
    // Radiology
    ("71020", "Chest X-ray, 2 views", "Radiology"),
    ("71010", "Chest X-ray, single view", "Radiology"),
    ("73721", "MRI lower extremity without contrast", "Radiology"),
    ("74177", "CT abdomen and pelvis with contrast", "Radiology"),
    ("76805", "Ultrasound pregnant uterus", "Radiology"),
    // Cardiology
    ("93000", "Electrocardiogram", "Cardiology"),
    ("93005", "Electrocardiogram, tracing only", "Cardiology"),
    ("93306", "Echocardiography complete", "Cardiology"),
    // Surgery
    ("10060", "Incision and drainage of abscess", "Surgery"),
    ("12001", "Simple repair of superficial wounds", "Surgery"),
    ("29881", "Arthroscopy, knee, with meniscectomy", "Surgery"),
    // Immunizations
    ("90471", "Immunization administration", "Immunizations"),
    ("90630", "Influenza vaccine", "Immunizations"),
    ("90707", "MMR vaccine", "Immunizations"),
];

/// Commonly used diagnosis codes as normalized records
pub fn common_diagnosis_codes() -> Vec<DiagnosisCode> {
    COMMON_DIAGNOSES
        .iter()
        .filter_map(|(code, description, chapter)| {
            let code = IcdCode::new((*code).to_string()).ok()?;
            Some(DiagnosisCode::new(
                code,
                (*description).to_string(),
                chapter,
                None,
            ))
        })
        .collect()
}

/// Commonly used billing concepts as normalized records
pub fn common_billing_concepts() -> Vec<BillingConcept> {
    COMMON_BILLING
        .iter()
        .map(|(code, description, category)| BillingConcept {
            code: (*code).to_string(),
            description: (*description).to_string(),
            category: (*category).to_string(),
            rvu: None,
        })
        .collect()
}

/// Load both seed lists into the store.
///
/// The full-import path passes `ConflictAction::Nothing` so XML-derived
/// descriptions are never clobbered by seed literals; the standalone seed
/// command passes `ConflictAction::Update` to refresh them.
///
/// Returns `(diagnosis_loaded, billing_loaded)`.
pub fn load_seed_codes(store: &mut dyn CodeStore, on_conflict: ConflictAction) -> (usize, usize) {
    let diagnosis_rows: Vec<_> = common_diagnosis_codes().iter().map(|c| c.to_row()).collect();
    let billing_rows: Vec<_> = common_billing_concepts().iter().map(|c| c.to_row()).collect();

    let diagnosis_loaded = load_records(store, &DIAGNOSIS_TABLE, &diagnosis_rows, on_conflict);
    let billing_loaded = load_records(store, &BILLING_TABLE, &billing_rows, on_conflict);
    (diagnosis_loaded, billing_loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_every_seed_diagnosis_is_well_formed() {
        // the static list round-trips through the same validator as the
        // XML pipeline, so a bad literal would silently vanish
        assert_eq!(common_diagnosis_codes().len(), COMMON_DIAGNOSES.len());
    }

    #[test]
    fn test_seed_categories_derived_from_codes() {
        for record in common_diagnosis_codes() {
            assert_eq!(record.category, &record.code.as_str()[..3]);
        }
    }

    #[test]
    fn test_seed_load_is_idempotent() {
        let mut store = MemoryStore::new();
        store.ensure_tables().unwrap();

        let (diag_first, billing_first) = load_seed_codes(&mut store, ConflictAction::Update);
        let (diag_second, billing_second) = load_seed_codes(&mut store, ConflictAction::Update);

        assert_eq!(diag_first, diag_second);
        assert_eq!(billing_first, billing_second);
        assert_eq!(
            store.count(&DIAGNOSIS_TABLE).unwrap(),
            COMMON_DIAGNOSES.len() as u64
        );
        assert_eq!(
            store.count(&BILLING_TABLE).unwrap(),
            COMMON_BILLING.len() as u64
        );
    }
}
