/*!
 * Schema definitions for the medical code lookup tables
 *
 * This module contains the table descriptors the upsert loader is driven
 * by: ordered, typed field specs plus the SQL text derived from them. One
 * generic loader serves all three tables; nothing is interpolated from
 * runtime strings.
 */

use chrono::NaiveDate;

/// Storage type of a single field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Bounded text, `VARCHAR(n)`
    VarChar(u16),
    /// Unbounded text
    Text,
    /// Double-precision float
    Double,
    /// Calendar date
    Date,
}

/// One typed field of a lookup table
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Rejected by the store when absent/empty
    pub required: bool,
    /// Carries the table's uniqueness constraint (the upsert conflict target)
    pub unique: bool,
}

impl FieldSpec {
    const fn text(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Text, required: false, unique: false }
    }

    const fn varchar(name: &'static str, len: u16) -> Self {
        Self { name, kind: FieldKind::VarChar(len), required: false, unique: false }
    }

    const fn date(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Date, required: false, unique: false }
    }

    const fn double(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Double, required: false, unique: false }
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    fn sql_type(&self) -> String {
        match self.kind {
            FieldKind::VarChar(len) => format!("VARCHAR({})", len),
            FieldKind::Text => "TEXT".to_string(),
            FieldKind::Double => "DOUBLE PRECISION".to_string(),
            FieldKind::Date => "DATE".to_string(),
        }
    }
}

/// Descriptor of one lookup table: name, ordered fields, secondary indexes
///
/// `id` and `created_at` are store-side defaults and never appear in the
/// field list handed to the loader.
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
    pub indexed: &'static [&'static str],
}

/// What an insert does when the unique code already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictAction {
    /// Overwrite every non-code field with the new values
    Update,
    /// Leave the existing row untouched
    Nothing,
}

impl TableSchema {
    /// Ordered field names
    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    /// Position of the unique code field within `fields`
    pub fn code_index(&self) -> usize {
        self.fields
            .iter()
            .position(|f| f.unique)
            .expect("table schema must carry a unique code field")
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for this table
    pub fn create_table_sql(&self) -> String {
        let mut columns = vec!["id SERIAL PRIMARY KEY".to_string()];
        for field in self.fields {
            let mut column = format!("{} {}", field.name, field.sql_type());
            if field.required {
                column.push_str(" NOT NULL");
            }
            if field.unique {
                column.push_str(" UNIQUE");
            }
            columns.push(column);
        }
        columns.push("created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP".to_string());
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            self.name,
            columns.join(",\n    ")
        )
    }

    /// `CREATE INDEX IF NOT EXISTS` statements for the secondary indexes
    pub fn index_sql(&self) -> Vec<String> {
        self.indexed
            .iter()
            .map(|field| {
                format!(
                    "CREATE INDEX IF NOT EXISTS idx_{}_{} ON {}({})",
                    self.name, field, self.name, field
                )
            })
            .collect()
    }

    /// Parameterized insert with the requested conflict behavior over the
    /// unique code field
    pub fn upsert_sql(&self, on_conflict: ConflictAction) -> String {
        let names = self.field_names().join(", ");
        let placeholders: Vec<String> =
            (1..=self.fields.len()).map(|i| format!("${}", i)).collect();
        let conflict_target = self.fields[self.code_index()].name;

        let conflict_clause = match on_conflict {
            ConflictAction::Nothing => format!("ON CONFLICT ({}) DO NOTHING", conflict_target),
            ConflictAction::Update => {
                let updates: Vec<String> = self
                    .fields
                    .iter()
                    .filter(|f| !f.unique)
                    .map(|f| format!("{} = EXCLUDED.{}", f.name, f.name))
                    .collect();
                format!(
                    "ON CONFLICT ({}) DO UPDATE SET {}",
                    conflict_target,
                    updates.join(", ")
                )
            }
        };

        format!(
            "INSERT INTO {} ({}) VALUES ({}) {}",
            self.name,
            names,
            placeholders.join(", "),
            conflict_clause
        )
    }

    /// Row-count query for the run-end summary
    pub fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) FROM {}", self.name)
    }
}

/// A typed field value bound into one insert parameter
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    OptText(Option<String>),
    Double(Option<f64>),
    Date(Option<NaiveDate>),
}

impl SqlValue {
    /// Whether the value satisfies a `required` field constraint
    pub fn is_present(&self) -> bool {
        match self {
            SqlValue::Text(s) => !s.is_empty(),
            SqlValue::OptText(opt) => opt.as_deref().is_some_and(|s| !s.is_empty()),
            SqlValue::Double(opt) => opt.is_some(),
            SqlValue::Date(opt) => opt.is_some(),
        }
    }
}

/// One record in table field order, ready for the loader
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub values: Vec<SqlValue>,
}

impl Row {
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self { values }
    }

    /// The record's code value, for conflict keying and failure logging
    pub fn code<'a>(&'a self, schema: &TableSchema) -> &'a str {
        match &self.values[schema.code_index()] {
            SqlValue::Text(code) => code,
            SqlValue::OptText(Some(code)) => code,
            _ => "",
        }
    }
}

/// ICD-10-CM diagnosis code lookup table
pub static DIAGNOSIS_TABLE: TableSchema = TableSchema {
    name: "diagnosis_codes",
    fields: &[
        FieldSpec::varchar("code", 10).required().unique(),
        FieldSpec::text("description").required(),
        FieldSpec::varchar("chapter_name", 255),
        FieldSpec::varchar("section_name", 255),
        FieldSpec::varchar("category", 10),
        FieldSpec::date("valid_from"),
        FieldSpec::date("valid_to"),
    ],
    indexed: &["code", "category"],
};

/// ICD-10-PCS procedure concept lookup table
pub static PROCEDURE_TABLE: TableSchema = TableSchema {
    name: "procedure_codes",
    fields: &[
        FieldSpec::varchar("code", 10).required().unique(),
        FieldSpec::text("description").required(),
        FieldSpec::varchar("section_name", 255),
        FieldSpec::varchar("body_system", 255),
        FieldSpec::varchar("operation_name", 255),
        FieldSpec::text("operation_definition"),
        FieldSpec::date("valid_from"),
        FieldSpec::date("valid_to"),
    ],
    indexed: &["code", "section_name", "body_system"],
};

/// Seed billing concept lookup table
pub static BILLING_TABLE: TableSchema = TableSchema {
    name: "billing_concepts",
    fields: &[
        FieldSpec::varchar("code", 10).required().unique(),
        FieldSpec::text("description").required(),
        FieldSpec::varchar("category", 255),
        FieldSpec::double("rvu"),
    ],
    indexed: &["code", "category"],
};

/// Every lookup table the pipeline maintains, in creation order
pub static ALL_TABLES: [&TableSchema; 3] = [&DIAGNOSIS_TABLE, &PROCEDURE_TABLE, &BILLING_TABLE];
