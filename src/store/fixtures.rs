//! Test stores laid out the way the converter writes them.

use std::collections::BTreeMap;
use std::path::Path;

use protobuf::Message;
use scip::types::{Index, Occurrence};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use super::decode::{encode_occurrences, is_definition};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE documents (
        id INTEGER PRIMARY KEY,
        language TEXT,
        relative_path TEXT NOT NULL,
        position_encoding TEXT,
        text TEXT
    )
    "#,
    r#"
    CREATE TABLE chunks (
        id INTEGER PRIMARY KEY,
        document_id INTEGER NOT NULL,
        chunk_index INTEGER NOT NULL,
        start_line INTEGER NOT NULL,
        end_line INTEGER NOT NULL,
        occurrences BLOB NOT NULL
    )
    "#,
    r#"
    CREATE TABLE symbols (
        id INTEGER PRIMARY KEY,
        symbol TEXT NOT NULL UNIQUE,
        display_name TEXT,
        kind INTEGER,
        documentation TEXT,
        signature BLOB,
        enclosing_symbol TEXT
    )
    "#,
    r#"
    CREATE TABLE mentions (
        chunk_id INTEGER NOT NULL,
        symbol_id INTEGER NOT NULL,
        role INTEGER NOT NULL
    )
    "#,
];

const DEFN_RANGES: &str = r#"
    CREATE TABLE defn_ranges (
        document_id INTEGER NOT NULL,
        symbol_id INTEGER NOT NULL,
        start_line INTEGER NOT NULL,
        start_char INTEGER NOT NULL,
        end_line INTEGER NOT NULL,
        end_char INTEGER NOT NULL
    )
"#;

pub fn occurrence(symbol: &str, range: &[i32], roles: i32) -> Occurrence {
    let mut occ = Occurrence::new();
    occ.symbol = symbol.to_string();
    occ.range = range.to_vec();
    occ.symbol_roles = roles;
    occ
}

pub struct StoreBuilder {
    pool: SqlitePool,
}

impl StoreBuilder {
    pub async fn create(path: &Path, with_defn_ranges: bool) -> Self {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();

        for ddl in SCHEMA {
            sqlx::query(ddl).execute(&pool).await.unwrap();
        }
        if with_defn_ranges {
            sqlx::query(DEFN_RANGES).execute(&pool).await.unwrap();
        }
        Self { pool }
    }

    pub async fn add_document(&self, relative_path: &str, language: &str) -> i64 {
        sqlx::query_scalar(
            "INSERT INTO documents (language, relative_path, position_encoding) VALUES (?, ?, 'UTF8CodeUnitOffsetFromLineStart') RETURNING id",
        )
        .bind(language)
        .bind(relative_path)
        .fetch_one(&self.pool)
        .await
        .unwrap()
    }

    /// Insert a symbol, or return the id of the existing row.
    pub async fn add_symbol(
        &self,
        symbol: &str,
        display_name: Option<&str>,
        kind: Option<i64>,
        documentation: Option<&str>,
        signature: Option<Vec<u8>>,
    ) -> i64 {
        sqlx::query(
            r#"
            INSERT INTO symbols (symbol, display_name, kind, documentation, signature)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(symbol) DO NOTHING
            "#,
        )
        .bind(symbol)
        .bind(display_name)
        .bind(kind)
        .bind(documentation)
        .bind(signature)
        .execute(&self.pool)
        .await
        .unwrap();

        self.symbol_id(symbol).await.unwrap()
    }

    async fn symbol_id(&self, symbol: &str) -> Option<i64> {
        sqlx::query_scalar("SELECT id FROM symbols WHERE symbol = ?")
            .bind(symbol)
            .fetch_optional(&self.pool)
            .await
            .unwrap()
    }

    /// Store one chunk and a mention per known symbol it touches, roles OR-ed together.
    pub async fn add_chunk(&self, document_id: i64, chunk_index: i64, occurrences: &[Occurrence]) -> i64 {
        let mut roles: BTreeMap<&str, i32> = BTreeMap::new();
        for occ in occurrences {
            *roles.entry(occ.symbol.as_str()).or_default() |= occ.symbol_roles;
        }

        let mut mentions = Vec::new();
        for (symbol, role) in roles {
            if let Some(id) = self.symbol_id(symbol).await {
                mentions.push((id, role));
            }
        }

        let start = occurrences.iter().filter_map(|o| o.range.first()).min().copied().unwrap_or(0);
        let end = occurrences
            .iter()
            .filter_map(|o| if o.range.len() == 4 { o.range.get(2) } else { o.range.first() })
            .max()
            .copied()
            .unwrap_or(0);

        self.insert_chunk(document_id, chunk_index, start, end, &encode_occurrences(occurrences), &mentions)
            .await
    }

    /// Store a chunk with an arbitrary blob and explicit mentions.
    pub async fn add_raw_chunk(&self, document_id: i64, chunk_index: i64, blob: &[u8], mentions: &[(i64, i32)]) -> i64 {
        self.insert_chunk(document_id, chunk_index, 0, 0, blob, mentions).await
    }

    async fn insert_chunk(
        &self,
        document_id: i64,
        chunk_index: i64,
        start_line: i32,
        end_line: i32,
        blob: &[u8],
        mentions: &[(i64, i32)],
    ) -> i64 {
        let chunk_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO chunks (document_id, chunk_index, start_line, end_line, occurrences)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(document_id)
        .bind(chunk_index)
        .bind(start_line)
        .bind(end_line)
        .bind(blob)
        .fetch_one(&self.pool)
        .await
        .unwrap();

        for (symbol_id, role) in mentions {
            sqlx::query("INSERT INTO mentions (chunk_id, symbol_id, role) VALUES (?, ?, ?)")
                .bind(chunk_id)
                .bind(symbol_id)
                .bind(role)
                .execute(&self.pool)
                .await
                .unwrap();
        }
        chunk_id
    }

    pub async fn add_defn_range(
        &self,
        document_id: i64,
        symbol_id: i64,
        start_line: i64,
        start_char: i64,
        end_line: i64,
        end_char: i64,
    ) {
        sqlx::query(
            r#"
            INSERT INTO defn_ranges (document_id, symbol_id, start_line, start_char, end_line, end_char)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(document_id)
        .bind(symbol_id)
        .bind(start_line)
        .bind(start_char)
        .bind(end_line)
        .bind(end_char)
        .execute(&self.pool)
        .await
        .unwrap();
    }

    pub async fn finish(self) {
        self.pool.close().await;
    }
}

/// Convert a SCIP index into a store, one chunk per document.
pub async fn write_store_from_index(index: &Index, path: &Path, with_defn_ranges: bool) {
    let store = StoreBuilder::create(path, with_defn_ranges).await;

    for info in index.documents.iter().flat_map(|d| d.symbols.iter()).chain(&index.external_symbols) {
        let documentation = (!info.documentation.is_empty())
            .then(|| serde_json::to_string(&info.documentation).unwrap());
        let signature = info
            .signature_documentation
            .as_ref()
            .map(|doc| doc.write_to_bytes().unwrap());
        let display_name = (!info.display_name.is_empty()).then_some(info.display_name.as_str());
        store
            .add_symbol(
                &info.symbol,
                display_name,
                Some(info.kind.value() as i64),
                documentation.as_deref(),
                signature,
            )
            .await;
    }

    for document in &index.documents {
        let document_id = store.add_document(&document.relative_path, &document.language).await;

        for occ in document.occurrences.iter().filter(|o| !o.symbol.starts_with("local ")) {
            let symbol_id = store.add_symbol(&occ.symbol, None, None, None, None).await;
            if with_defn_ranges && is_definition(occ.symbol_roles) {
                let (line, col) = (occ.range[0] as i64, occ.range[1] as i64);
                let (end_line, end_col) = match occ.range.len() {
                    4 => (occ.range[2] as i64, occ.range[3] as i64),
                    _ => (line, occ.range[2] as i64),
                };
                store.add_defn_range(document_id, symbol_id, line, col, end_line, end_col).await;
            }
        }

        store.add_chunk(document_id, 0, &document.occurrences).await;
    }

    store.finish().await;
}
