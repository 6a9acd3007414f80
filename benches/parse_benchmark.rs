use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use medcodes::prelude::*;
use medcodes::reader::{parse_diagnosis_stream, parse_procedure_stream};
use quick_xml::Reader;

// Generate a synthetic tabular document with the given number of entries
fn synthetic_diagnosis_xml(entries: usize) -> String {
    let mut xml = String::from("<ICD10CM.tabular><chapter><desc>Synthetic Chapter</desc>");
    for i in 0..entries {
        xml.push_str(&format!(
            "<diag><name>A{:02}.{}</name><desc>Synthetic condition number {}</desc></diag>",
            i % 100,
            i % 10,
            i
        ));
    }
    xml.push_str("</chapter></ICD10CM.tabular>");
    xml
}

fn synthetic_procedure_xml(tables: usize) -> String {
    let mut xml = String::from("<ICD10PCS.tabular>");
    for i in 0..tables {
        xml.push_str(&format!(
            concat!(
                "<pcsTable>",
                "<axis pos=\"1\"><title>Section</title><label>Medical and Surgical</label></axis>",
                "<axis pos=\"2\"><title>Body System</title><label>Body System {}</label></axis>",
                "<axis pos=\"3\"><title>Operation</title><label>Operation {}</label>",
                "<definition>Synthetic definition text</definition></axis>",
                "</pcsTable>"
            ),
            i, i
        ));
    }
    xml.push_str("</ICD10PCS.tabular>");
    xml
}

fn benchmark_code_validation(c: &mut Criterion) {
    c.bench_function("code_validation_valid", |b| {
        b.iter(|| {
            let result = validate_diagnosis_code(black_box("S72.001A"));
            assert!(result.is_some());
        })
    });

    c.bench_function("code_validation_invalid", |b| {
        b.iter(|| {
            let result = validate_diagnosis_code(black_box("not-a-code"));
            assert!(result.is_none());
        })
    });
}

fn benchmark_diagnosis_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("diagnosis_parsing");
    for entries in [100, 1_000, 10_000] {
        let xml = synthetic_diagnosis_xml(entries);
        group.bench_with_input(BenchmarkId::from_parameter(entries), &xml, |b, xml| {
            b.iter(|| {
                let mut reader = Reader::from_reader(xml.as_bytes());
                reader.config_mut().trim_text(true);
                let codes = parse_diagnosis_stream(&mut reader, |_| {}).unwrap();
                assert_eq!(codes.len(), entries);
            })
        });
    }
    group.finish();
}

fn benchmark_procedure_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("procedure_parsing");
    for tables in [100, 1_000] {
        let xml = synthetic_procedure_xml(tables);
        group.bench_with_input(BenchmarkId::from_parameter(tables), &xml, |b, xml| {
            b.iter(|| {
                let mut reader = Reader::from_reader(xml.as_bytes());
                reader.config_mut().trim_text(true);
                let codes = parse_procedure_stream(&mut reader, |_| {}).unwrap();
                assert_eq!(codes.len(), tables);
            })
        });
    }
    group.finish();
}

fn benchmark_memory_store_load(c: &mut Criterion) {
    let xml = synthetic_diagnosis_xml(1_000);
    let mut reader = Reader::from_reader(xml.as_bytes());
    reader.config_mut().trim_text(true);
    let codes = parse_diagnosis_stream(&mut reader, |_| {}).unwrap();
    let rows: Vec<_> = codes.iter().map(|code| code.to_row()).collect();

    c.bench_function("memory_store_load_1000", |b| {
        b.iter(|| {
            let mut store = MemoryStore::new();
            store.ensure_tables().unwrap();
            let committed = load_records(
                &mut store,
                &DIAGNOSIS_TABLE,
                black_box(&rows),
                ConflictAction::Update,
            );
            assert!(committed > 0);
        })
    });
}

criterion_group!(
    benches,
    benchmark_code_validation,
    benchmark_diagnosis_parsing,
    benchmark_procedure_parsing,
    benchmark_memory_store_load
);
criterion_main!(benches);
