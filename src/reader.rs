/*!
 * Streaming XML readers for CMS coding releases
 *
 * This module walks the ICD-10-CM tabular hierarchy (chapter, section,
 * diagnosis entry) and the ICD-10-PCS table structure (table, axis, label,
 * definition) and emits normalized records in document order. Both walks
 * are single-pass and forward-only: contextual labels are traversal-order
 * state threaded through the event loop, never globals.
 */

use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::path::Path;
use std::time::Instant;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use sha2::{Digest, Sha256};

#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressStyle};

use crate::constants::{
    NO_DESCRIPTION, UNKNOWN_BODY_SYSTEM, UNKNOWN_CHAPTER, UNKNOWN_OPERATION, UNKNOWN_SECTION,
};
use crate::data_types::{DiagnosisCode, IcdCode, ProcedureCode};
use crate::{MedCodesError, Result};

/// Reader for CMS coding release files
pub struct CodeReader {
    /// Whether to show progress bar
    #[cfg(feature = "progress")]
    show_progress_bar: bool,
}

impl Default for CodeReader {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeReader {
    /// Create a new reader with default settings
    pub fn new() -> Self {
        Self {
            #[cfg(feature = "progress")]
            show_progress_bar: true,
        }
    }

    /// Enable or disable the progress bar
    #[cfg(feature = "progress")]
    pub fn with_progress_bar(mut self, show: bool) -> Self {
        self.show_progress_bar = show;
        self
    }

    /// Load ICD-10-CM diagnosis codes from a tabular XML file.
    ///
    /// A malformed document yields an `XmlParse` error scoped to this file;
    /// a well-formed but empty document yields an empty sequence.
    pub fn load_diagnosis_codes<P: AsRef<Path>>(&self, path: P) -> Result<Vec<DiagnosisCode>> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MedCodesError::file_not_found_with_suggestion(
                path.to_path_buf(),
            ));
        }

        let file = File::open(path)?;
        let file_size = file.metadata()?.len();
        let mut reader = Reader::from_reader(BufReader::new(file));
        reader.config_mut().trim_text(true);

        #[cfg(feature = "progress")]
        let progress_bar = self.make_progress_bar(file_size);
        #[cfg(not(feature = "progress"))]
        let _ = file_size;

        let start_time = Instant::now();
        let codes = parse_diagnosis_stream(&mut reader, |position| {
            #[cfg(feature = "progress")]
            if let Some(ref pb) = progress_bar {
                pb.set_position(position);
            }
            #[cfg(not(feature = "progress"))]
            let _ = position;
        })
        .map_err(|e| MedCodesError::XmlParse {
            message: e.to_string(),
            file: path.to_path_buf(),
            position: Some(reader.buffer_position()),
        })?;

        #[cfg(feature = "progress")]
        if let Some(pb) = progress_bar {
            pb.finish_and_clear();
        }

        let elapsed = start_time.elapsed();
        println!(
            "Parsed {} diagnosis codes from {} in {:.2}s",
            codes.len(),
            path.display(),
            elapsed.as_secs_f64()
        );

        Ok(codes)
    }

    /// Load ICD-10-PCS procedure concepts from a tables XML file.
    ///
    /// Emits one record per table (not the combinatorial code space),
    /// deduplicated by description. Same file-scoped error behavior as
    /// [`Self::load_diagnosis_codes`].
    pub fn load_procedure_codes<P: AsRef<Path>>(&self, path: P) -> Result<Vec<ProcedureCode>> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MedCodesError::file_not_found_with_suggestion(
                path.to_path_buf(),
            ));
        }

        let file = File::open(path)?;
        let file_size = file.metadata()?.len();
        let mut reader = Reader::from_reader(BufReader::new(file));
        reader.config_mut().trim_text(true);

        #[cfg(feature = "progress")]
        let progress_bar = self.make_progress_bar(file_size);
        #[cfg(not(feature = "progress"))]
        let _ = file_size;

        let start_time = Instant::now();
        let codes = parse_procedure_stream(&mut reader, |position| {
            #[cfg(feature = "progress")]
            if let Some(ref pb) = progress_bar {
                pb.set_position(position);
            }
            #[cfg(not(feature = "progress"))]
            let _ = position;
        })
        .map_err(|e| MedCodesError::XmlParse {
            message: e.to_string(),
            file: path.to_path_buf(),
            position: Some(reader.buffer_position()),
        })?;

        #[cfg(feature = "progress")]
        if let Some(pb) = progress_bar {
            pb.finish_and_clear();
        }

        let elapsed = start_time.elapsed();
        println!(
            "Parsed {} unique procedure concepts from {} in {:.2}s",
            codes.len(),
            path.display(),
            elapsed.as_secs_f64()
        );

        Ok(codes)
    }

    #[cfg(feature = "progress")]
    fn make_progress_bar(&self, file_size: u64) -> Option<ProgressBar> {
        if !self.show_progress_bar {
            return None;
        }
        let pb = ProgressBar::new(file_size);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                .unwrap()
                .progress_chars("#>-"),
        );
        Some(pb)
    }
}

/// What a text-capture buffer is currently feeding
enum CaptureTarget {
    ChapterDesc,
    DiagName,
    DiagDesc,
    AxisLabel,
    AxisDefinition,
}

/// Pending diagnosis entry while its children stream past
#[derive(Default)]
struct DiagFrame {
    /// Code from the `name` attribute, if the release carries one
    attr_code: Option<String>,
    /// Code from the child `<name>` element; preferred over the attribute
    child_code: Option<String>,
    description: Option<String>,
    emitted: bool,
}

impl DiagFrame {
    fn code(&self) -> Option<&str> {
        self.child_code.as_deref().or(self.attr_code.as_deref())
    }
}

/// Parse the chapter/section/diag hierarchy from a streaming reader.
///
/// `current_chapter` persists from one chapter label to the next;
/// `current_section` is scoped to the descendants of its `<section>`.
/// Nested `<diag>` entries are tracked on an explicit frame stack so each
/// emits exactly one record, in document order.
pub fn parse_diagnosis_stream<R: BufRead>(
    reader: &mut Reader<R>,
    mut on_progress: impl FnMut(u64),
) -> std::result::Result<Vec<DiagnosisCode>, quick_xml::Error> {
    let mut codes = Vec::new();
    let mut buf = Vec::new();

    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut current_chapter = UNKNOWN_CHAPTER.to_string();
    let mut current_section: Option<String> = None;
    let mut diag_stack: Vec<DiagFrame> = Vec::new();
    let mut capture: Option<(CaptureTarget, String)> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let parent = path.last().cloned();
                match e.name().as_ref() {
                    b"section" => {
                        current_section =
                            Some(attribute(e, b"desc").unwrap_or_else(|| UNKNOWN_SECTION.to_string()));
                    }
                    b"diag" => {
                        diag_stack.push(DiagFrame {
                            attr_code: attribute(e, b"name"),
                            ..DiagFrame::default()
                        });
                    }
                    b"desc" => match parent.as_deref() {
                        Some(b"chapter") => capture = Some((CaptureTarget::ChapterDesc, String::new())),
                        Some(b"diag") => {
                            let pending = diag_stack.last().is_some_and(|f| f.description.is_none());
                            if pending {
                                capture = Some((CaptureTarget::DiagDesc, String::new()));
                            }
                        }
                        _ => {}
                    },
                    b"name" => {
                        if matches!(parent.as_deref(), Some(b"diag"))
                            && diag_stack.last().is_some_and(|f| f.child_code.is_none())
                        {
                            capture = Some((CaptureTarget::DiagName, String::new()));
                        }
                    }
                    _ => {}
                }
                path.push(e.name().as_ref().to_vec());
            }
            Event::Empty(ref e) => {
                // a self-closing diag can still carry its code as an attribute
                if e.name().as_ref() == b"diag" {
                    let mut frame = DiagFrame {
                        attr_code: attribute(e, b"name"),
                        ..DiagFrame::default()
                    };
                    emit_diagnosis(&mut frame, &current_chapter, current_section.as_deref(), &mut codes);
                }
            }
            Event::Text(e) => {
                if let Some((_, text)) = capture.as_mut() {
                    text.push_str(&quick_xml::escape::unescape(&e.decode()?)?);
                }
            }
            Event::End(ref e) => {
                path.pop();
                match e.name().as_ref() {
                    b"section" => current_section = None,
                    b"diag" => {
                        if let Some(mut frame) = diag_stack.pop() {
                            emit_diagnosis(
                                &mut frame,
                                &current_chapter,
                                current_section.as_deref(),
                                &mut codes,
                            );
                        }
                    }
                    b"desc" | b"name" => {
                        if let Some((target, text)) = capture.take() {
                            match target {
                                CaptureTarget::ChapterDesc => {
                                    if !text.trim().is_empty() {
                                        current_chapter = text.trim().to_string();
                                    }
                                }
                                CaptureTarget::DiagName => {
                                    if let Some(frame) = diag_stack.last_mut() {
                                        frame.child_code = Some(text.trim().to_string());
                                    }
                                }
                                CaptureTarget::DiagDesc => {
                                    if let Some(frame) = diag_stack.last_mut() {
                                        frame.description = Some(text.trim().to_string());
                                        // name and desc lead the entry; emitting
                                        // here keeps parents ahead of nested diags
                                        emit_diagnosis(
                                            frame,
                                            &current_chapter,
                                            current_section.as_deref(),
                                            &mut codes,
                                        );
                                    }
                                }
                                _ => {}
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
        on_progress(reader.buffer_position());
        buf.clear();
    }

    Ok(codes)
}

/// Emit a record for a finished (or fully-described) diagnosis frame.
///
/// A missing description never drops the record; a missing or malformed
/// code always does.
fn emit_diagnosis(
    frame: &mut DiagFrame,
    chapter: &str,
    section: Option<&str>,
    codes: &mut Vec<DiagnosisCode>,
) {
    if frame.emitted {
        return;
    }
    let Some(raw_code) = frame.code() else {
        return;
    };
    let code = match IcdCode::new(raw_code.to_string()) {
        Ok(code) => code,
        Err(_) => {
            // expected filtering of non-code tokens, not a hard failure
            log::debug!("dropping entry with malformed code '{}'", raw_code);
            frame.emitted = true;
            return;
        }
    };
    let description = frame
        .description
        .clone()
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| NO_DESCRIPTION.to_string());
    codes.push(DiagnosisCode::new(code, description, chapter, section));
    frame.emitted = true;
}

/// Axis fields gathered for the current `<pcsTable>`
struct TableFrame {
    section_name: String,
    body_system: String,
    operation_name: String,
    operation_definition: String,
    operation_found: bool,
}

impl TableFrame {
    fn new() -> Self {
        Self {
            section_name: UNKNOWN_SECTION.to_string(),
            body_system: UNKNOWN_BODY_SYSTEM.to_string(),
            operation_name: UNKNOWN_OPERATION.to_string(),
            operation_definition: String::new(),
            operation_found: false,
        }
    }
}

/// Parse PCS tables from a streaming reader.
///
/// Only the axes that are direct children of a `<pcsTable>` describe the
/// table itself (positions 1-3); axes nested under rows enumerate the code
/// space and are skipped. Records are deduplicated by description, first
/// occurrence wins.
pub fn parse_procedure_stream<R: BufRead>(
    reader: &mut Reader<R>,
    mut on_progress: impl FnMut(u64),
) -> std::result::Result<Vec<ProcedureCode>, quick_xml::Error> {
    let mut codes: Vec<ProcedureCode> = Vec::new();
    let mut seen_descriptions = std::collections::HashSet::new();
    let mut buf = Vec::new();

    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut table: Option<TableFrame> = None;
    let mut axis_pos: Option<u8> = None;
    let mut axis_label_seen = false;
    let mut capture: Option<(CaptureTarget, String)> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let parent = path.last().cloned();
                match e.name().as_ref() {
                    b"pcsTable" => table = Some(TableFrame::new()),
                    b"axis" if matches!(parent.as_deref(), Some(b"pcsTable")) => {
                        axis_pos = attribute(e, b"pos").and_then(|p| p.parse().ok());
                        axis_label_seen = false;
                    }
                    b"label" => {
                        let in_table_axis =
                            matches!(parent.as_deref(), Some(b"axis")) && axis_pos.is_some();
                        if in_table_axis && !axis_label_seen {
                            capture = Some((CaptureTarget::AxisLabel, String::new()));
                        }
                    }
                    b"definition" => {
                        if matches!(parent.as_deref(), Some(b"axis")) && axis_pos == Some(3) {
                            capture = Some((CaptureTarget::AxisDefinition, String::new()));
                        }
                    }
                    _ => {}
                }
                path.push(e.name().as_ref().to_vec());
            }
            Event::Text(e) => {
                if let Some((_, text)) = capture.as_mut() {
                    text.push_str(&quick_xml::escape::unescape(&e.decode()?)?);
                }
            }
            Event::End(ref e) => {
                path.pop();
                match e.name().as_ref() {
                    b"label" | b"definition" => {
                        if let Some((target, text)) = capture.take() {
                            let text = text.trim().to_string();
                            if let Some(frame) = table.as_mut() {
                                match target {
                                    CaptureTarget::AxisLabel => {
                                        axis_label_seen = true;
                                        route_axis_label(frame, axis_pos, text);
                                    }
                                    CaptureTarget::AxisDefinition => {
                                        frame.operation_definition = text;
                                    }
                                    _ => {}
                                }
                            }
                        }
                    }
                    b"axis" => {
                        if matches!(path.last().map(|p| p.as_slice()), Some(b"pcsTable")) {
                            axis_pos = None;
                        }
                    }
                    b"pcsTable" => {
                        if let Some(frame) = table.take() {
                            if let Some(record) = synthesize_procedure(&frame) {
                                if seen_descriptions.insert(record.description.clone()) {
                                    codes.push(record);
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
        on_progress(reader.buffer_position());
        buf.clear();
    }

    Ok(codes)
}

fn route_axis_label(frame: &mut TableFrame, pos: Option<u8>, text: String) {
    if text.is_empty() {
        return;
    }
    match pos {
        Some(1) => frame.section_name = text,
        Some(2) => frame.body_system = text,
        Some(3) => {
            frame.operation_name = text;
            frame.operation_found = true;
        }
        _ => {}
    }
}

/// Build the normalized record for a finished table, if it named an
/// operation
fn synthesize_procedure(frame: &TableFrame) -> Option<ProcedureCode> {
    if !frame.operation_found {
        return None;
    }
    let description = format!("{} - {}", frame.operation_name, frame.body_system);
    let description = description
        .trim_matches(|c| c == ' ' || c == '-')
        .to_string();
    Some(ProcedureCode {
        code: placeholder_code(&frame.section_name, &frame.body_system, &frame.operation_name),
        description,
        section_name: frame.section_name.clone(),
        body_system: frame.body_system.clone(),
        operation_name: frame.operation_name.clone(),
        operation_definition: if frame.operation_definition.is_empty() {
            None
        } else {
            Some(frame.operation_definition.clone())
        },
        valid_from: None,
        valid_to: None,
    })
}

/// Synthesize the 7-character placeholder identifier for a table concept.
///
/// The leading character encodes the PCS section; the remaining six are a
/// digest of the full axis tuple, so distinct concepts never collide on the
/// storage key. The result is stable across runs but is NOT an addressable
/// ICD-10-PCS code.
pub fn placeholder_code(section: &str, body_system: &str, operation: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(section.as_bytes());
    hasher.update([0x1f]);
    hasher.update(body_system.as_bytes());
    hasher.update([0x1f]);
    hasher.update(operation.as_bytes());
    let digest = hasher.finalize();

    let mut code = String::with_capacity(7);
    code.push(pcs_section_char(section));
    for byte in &digest[..3] {
        code.push_str(&format!("{:02X}", byte));
    }
    code
}

/// Map a PCS section title to its leading code character
fn pcs_section_char(section: &str) -> char {
    match section {
        "Medical and Surgical" => '0',
        "Obstetrics" => '1',
        "Placement" => '2',
        "Administration" => '3',
        "Measurement and Monitoring" => '4',
        "Extracorporeal or Systemic Assistance and Performance" => '5',
        "Extracorporeal or Systemic Therapies" => '6',
        "Osteopathic" => '7',
        "Other Procedures" => '8',
        "Chiropractic" => '9',
        "Imaging" => 'B',
        "Nuclear Medicine" => 'C',
        "Radiation Therapy" => 'D',
        "Physical Rehabilitation and Diagnostic Audiology" => 'F',
        "Mental Health" => 'G',
        "Substance Abuse Treatment" => 'H',
        "New Technology" => 'X',
        _ => '0',
    }
}

fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == name)
        .and_then(|attr| attr.unescape_value().ok())
        .map(|value| value.trim().to_string())
}
