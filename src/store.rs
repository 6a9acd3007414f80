/*!
 * Persistent store backends and the upsert loader
 *
 * The pipeline writes through the [`CodeStore`] trait: a PostgreSQL backend
 * for production runs and an in-memory backend used by the test suite. The
 * generic [`load_records`] loader drives any backend from a table schema
 * and a sequence of rows, isolating per-record failures.
 */

use std::collections::{BTreeMap, HashMap};

use postgres::types::ToSql;
use postgres::{Client, NoTls};

use crate::config::StoreConfig;
use crate::schema::{ConflictAction, FieldKind, Row, SqlValue, TableSchema, ALL_TABLES};
use crate::{MedCodesError, Result};

/// A store of normalized code records keyed on each table's unique code
pub trait CodeStore {
    /// Create the lookup tables and their indexes if absent
    fn ensure_tables(&mut self) -> Result<()>;

    /// Insert one record; on a code conflict, apply `on_conflict`.
    ///
    /// Atomic per record: the row is fully inserted/updated or left
    /// unchanged.
    fn upsert(&mut self, schema: &TableSchema, row: &Row, on_conflict: ConflictAction)
        -> Result<()>;

    /// Number of rows currently in a table
    fn count(&mut self, schema: &TableSchema) -> Result<u64>;
}

/// Load a sequence of records into one table, tolerating per-record failure.
///
/// Each failed upsert is logged with the offending code and skipped; the
/// rest of the batch proceeds. Returns the count of records committed.
/// Running the same sequence twice leaves the table in the same final state
/// as running it once.
pub fn load_records(
    store: &mut dyn CodeStore,
    schema: &TableSchema,
    rows: &[Row],
    on_conflict: ConflictAction,
) -> usize {
    let mut committed = 0;
    for row in rows {
        match store.upsert(schema, row, on_conflict) {
            Ok(()) => committed += 1,
            Err(e) => {
                log::warn!(
                    "skipping code '{}' in {}: {}",
                    row.code(schema),
                    schema.name,
                    e
                );
            }
        }
    }
    committed
}

/// PostgreSQL-backed store
///
/// Uses a synchronous session: the import is a strictly sequential batch
/// job, one record in flight at a time.
pub struct PostgresStore {
    client: Client,
}

impl PostgresStore {
    /// Establish a session with the configured database.
    ///
    /// Failure here is fatal to the run; no parsing happens without a store.
    pub fn connect(config: &StoreConfig) -> Result<Self> {
        let client = postgres::Config::new()
            .host(&config.host)
            .port(config.port)
            .dbname(&config.database)
            .user(&config.user)
            .password(&config.password)
            .connect(NoTls)
            .map_err(|e| MedCodesError::connection(e.to_string()))?;
        Ok(Self { client })
    }
}

impl CodeStore for PostgresStore {
    fn ensure_tables(&mut self) -> Result<()> {
        for table in ALL_TABLES {
            self.client.batch_execute(&table.create_table_sql())?;
            for statement in table.index_sql() {
                self.client.batch_execute(&statement)?;
            }
        }
        Ok(())
    }

    fn upsert(
        &mut self,
        schema: &TableSchema,
        row: &Row,
        on_conflict: ConflictAction,
    ) -> Result<()> {
        let sql = schema.upsert_sql(on_conflict);
        let params: Vec<&(dyn ToSql + Sync)> = row.values.iter().map(sql_param).collect();
        self.client
            .execute(sql.as_str(), &params)
            .map_err(|e| MedCodesError::StoreWrite {
                code: row.code(schema).to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    fn count(&mut self, schema: &TableSchema) -> Result<u64> {
        let row = self.client.query_one(schema.count_sql().as_str(), &[])?;
        let count: i64 = row.get(0);
        Ok(count as u64)
    }
}

fn sql_param(value: &SqlValue) -> &(dyn ToSql + Sync) {
    match value {
        SqlValue::Text(v) => v,
        SqlValue::OptText(v) => v,
        SqlValue::Double(v) => v,
        SqlValue::Date(v) => v,
    }
}

/// In-memory store keyed by code, mirroring the upsert and constraint
/// semantics of the PostgreSQL backend
///
/// Used by the test suite and available wherever a run must not touch a
/// real database.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: HashMap<&'static str, BTreeMap<String, Row>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored row for a code, if present
    pub fn get(&self, schema: &TableSchema, code: &str) -> Option<&Row> {
        self.tables.get(schema.name)?.get(code)
    }

    fn check_constraints(schema: &TableSchema, row: &Row) -> Result<()> {
        if row.values.len() != schema.fields.len() {
            return Err(MedCodesError::StoreWrite {
                code: row.code(schema).to_string(),
                message: format!(
                    "expected {} values, got {}",
                    schema.fields.len(),
                    row.values.len()
                ),
            });
        }
        for (field, value) in schema.fields.iter().zip(&row.values) {
            if field.required && !value.is_present() {
                return Err(MedCodesError::StoreWrite {
                    code: row.code(schema).to_string(),
                    message: format!("null value in column \"{}\"", field.name),
                });
            }
            if let FieldKind::VarChar(len) = field.kind {
                let text = match value {
                    SqlValue::Text(s) => Some(s.as_str()),
                    SqlValue::OptText(opt) => opt.as_deref(),
                    _ => None,
                };
                if text.is_some_and(|s| s.len() > len as usize) {
                    return Err(MedCodesError::StoreWrite {
                        code: row.code(schema).to_string(),
                        message: format!("value too long for column \"{}\"", field.name),
                    });
                }
            }
        }
        Ok(())
    }
}

impl CodeStore for MemoryStore {
    fn ensure_tables(&mut self) -> Result<()> {
        for table in ALL_TABLES {
            self.tables.entry(table.name).or_default();
        }
        Ok(())
    }

    fn upsert(
        &mut self,
        schema: &TableSchema,
        row: &Row,
        on_conflict: ConflictAction,
    ) -> Result<()> {
        Self::check_constraints(schema, row)?;
        let table = self.tables.entry(schema.name).or_default();
        let code = row.code(schema).to_string();
        match table.get_mut(&code) {
            Some(existing) => match on_conflict {
                ConflictAction::Nothing => {}
                ConflictAction::Update => {
                    // the code field itself is never rewritten
                    let code_index = schema.code_index();
                    for (i, value) in row.values.iter().enumerate() {
                        if i != code_index {
                            existing.values[i] = value.clone();
                        }
                    }
                }
            },
            None => {
                table.insert(code, row.clone());
            }
        }
        Ok(())
    }

    fn count(&mut self, schema: &TableSchema) -> Result<u64> {
        Ok(self
            .tables
            .get(schema.name)
            .map(|t| t.len() as u64)
            .unwrap_or(0))
    }
}
