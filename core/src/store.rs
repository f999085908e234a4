//! SQLite persistence for feature vectors.
//!
//! RULE: Only store.rs talks to the database.
//! The table is dropped and recreated on every `replace_table` call;
//! its columns are `user_id`, `evaluated_at` and one INTEGER column per
//! schema feature, in schema order (flags as 0/1, timestamps as elapsed
//! seconds).

use crate::{
    error::RiskResult,
    feature_vector::FeatureVector,
    schema::{FeatureSchema, FeatureValue},
};
use log::info;
use rusqlite::{params_from_iter, types::Value, Connection};

pub const FEATURE_TABLE: &str = "training_features";

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub struct FeatureStore {
    conn: Connection,
    table: String,
}

impl FeatureStore {
    pub fn open(path: &str) -> RiskResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode only for real files; in-memory databases ignore it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self { conn, table: FEATURE_TABLE.to_string() })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> RiskResult<Self> {
        Ok(Self { conn: Connection::open_in_memory()?, table: FEATURE_TABLE.to_string() })
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn clear(&self) -> RiskResult<()> {
        self.conn
            .execute_batch(&format!("DROP TABLE IF EXISTS {};", quote_ident(&self.table)))?;
        Ok(())
    }

    /// Drop, recreate and fill the feature table in one transaction.
    pub fn replace_table(&mut self, schema: &FeatureSchema, vectors: &[FeatureVector]) -> RiskResult<()> {
        let table = quote_ident(&self.table);
        let feature_cols: Vec<String> = schema.names().map(quote_ident).collect();

        let create_cols = std::iter::once("\"user_id\" TEXT PRIMARY KEY".to_string())
            .chain(std::iter::once("\"evaluated_at\" INTEGER NOT NULL".to_string()))
            .chain(feature_cols.iter().map(|c| format!("{c} INTEGER NOT NULL")))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=schema.len() + 2)
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");

        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table}; CREATE TABLE {table} ({create_cols});"
        ))?;
        {
            let mut stmt = tx.prepare(&format!("INSERT INTO {table} VALUES ({placeholders})"))?;
            for v in vectors {
                let row = std::iter::once(Value::Text(v.user_id.clone()))
                    .chain(std::iter::once(Value::Integer(v.evaluated_at)))
                    .chain(v.values().iter().map(|f| Value::Integer(f.as_i64())));
                stmt.execute(params_from_iter(row))?;
            }
        }
        tx.commit()?;

        info!("stored {} feature rows in {}", vectors.len(), self.table);
        Ok(())
    }

    /// Read every row back, ordered by user id.
    pub fn load_table(&self, schema: &FeatureSchema) -> RiskResult<Vec<FeatureVector>> {
        let cols = std::iter::once("\"user_id\"".to_string())
            .chain(std::iter::once("\"evaluated_at\"".to_string()))
            .chain(schema.names().map(quote_ident))
            .collect::<Vec<_>>()
            .join(", ");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {cols} FROM {} ORDER BY \"user_id\"",
            quote_ident(&self.table)
        ))?;

        let rows = stmt.query_map([], |row| {
            let user_id: String = row.get(0)?;
            let evaluated_at: i64 = row.get(1)?;
            let mut values = Vec::with_capacity(schema.len());
            for (i, def) in schema.defs().iter().enumerate() {
                values.push(FeatureValue::from_stored(def.kind, row.get(i + 2)?));
            }
            Ok((user_id, evaluated_at, values))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (user_id, evaluated_at, values) = row?;
            out.push(FeatureVector::from_values(schema, user_id, evaluated_at, values)?);
        }
        Ok(out)
    }

    pub fn row_count(&self) -> RiskResult<i64> {
        let n = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(&self.table)),
            [],
            |row| row.get(0),
        )?;
        Ok(n)
    }
}
