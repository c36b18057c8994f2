//! Read-only query engine over a converted symbol store.
//!
//! Definitions and per-file listings prefer the precomputed `defn_ranges`
//! table. Stores built without it (or with it empty) are answered by decoding
//! the occurrence chunks reachable through `mentions`.
//!
//! A `SymbolIndex` keeps its pool and cache for its whole life. After the
//! store is rebuilt, open a new instance to see the new data.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};

use super::cache::SymbolCache;
use super::decode::{Range, decode_occurrences, decode_signature, is_definition, role_label};
use super::error::QueryError;
use super::models::{
    ChunkRow, DefnRangeRow, FileDefnRow, FileSymbol, Location, Reference, SearchRow, StoreStats,
    Symbol, SymbolKind, SymbolMatch, SymbolRow, parse_documentation, to_position,
};

/// Connections kept open against the store.
const MAX_CONNECTIONS: u32 = 4;

const DEFAULT_SEARCH_LIMIT: i64 = 20;

/// Secondary indexes created on open, keyed by the table they need.
const SECONDARY_INDEXES: &[(&str, &str)] = &[
    ("symbols", "CREATE INDEX IF NOT EXISTS idx_symbols_symbol ON symbols(symbol)"),
    ("symbols", "CREATE INDEX IF NOT EXISTS idx_symbols_display_name ON symbols(display_name)"),
    ("mentions", "CREATE INDEX IF NOT EXISTS idx_mentions_symbol_role ON mentions(symbol_id, role)"),
    ("documents", "CREATE INDEX IF NOT EXISTS idx_documents_path ON documents(relative_path)"),
    ("chunks", "CREATE INDEX IF NOT EXISTS idx_chunks_document ON chunks(document_id)"),
    ("defn_ranges", "CREATE INDEX IF NOT EXISTS idx_defn_ranges_symbol ON defn_ranges(symbol_id)"),
    ("defn_ranges", "CREATE INDEX IF NOT EXISTS idx_defn_ranges_document ON defn_ranges(document_id)"),
];

/// Path of the first document where a chunk carries a definition of `s.id`.
const MENTION_DEFINITION_PATH: &str = r#"
    (SELECT d.relative_path FROM mentions m
     JOIN chunks c ON c.id = m.chunk_id
     LEFT JOIN documents d ON d.id = c.document_id
     WHERE m.symbol_id = s.id AND (m.role & 1) != 0
     ORDER BY c.id LIMIT 1)
"#;

/// Query engine over a SQLite symbol store.
pub struct SymbolIndex {
    pool: SqlitePool,
    cache: SymbolCache,
    has_defn_ranges: bool,
}

impl SymbolIndex {
    /// Open an existing store.
    pub async fn open(store_path: &Path) -> Result<Self, QueryError> {
        if !store_path.is_file() {
            return Err(QueryError::StoreNotFound(store_path.display().to_string()));
        }

        let options = SqliteConnectOptions::new()
            .filename(store_path)
            .create_if_missing(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        let tables: Vec<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table'")
                .fetch_all(&pool)
                .await?;

        for (table, ddl) in SECONDARY_INDEXES {
            if tables.iter().any(|t| t == table) {
                sqlx::query(ddl).execute(&pool).await?;
            }
        }

        let has_defn_ranges = tables.iter().any(|t| t == "defn_ranges");
        info!(store = %store_path.display(), has_defn_ranges, "opened symbol index");

        Ok(Self {
            pool,
            cache: SymbolCache::default(),
            has_defn_ranges,
        })
    }

    // ==================== Search ====================

    /// Case-insensitive substring search over symbol identifiers and display names.
    ///
    /// Exact display-name matches rank first, then exact identifier matches,
    /// then identifiers in lexicographic order. A non-positive limit means 20.
    pub async fn find_symbols(&self, query: &str, limit: i64) -> Result<Vec<SymbolMatch>, QueryError> {
        if query.is_empty() {
            return Err(QueryError::EmptyQuery);
        }
        let limit = if limit <= 0 { DEFAULT_SEARCH_LIMIT } else { limit };
        // SQLite lower() folds ASCII only, so the pattern must fold the same way
        let pattern = format!("%{}%", escape_like(&query.to_ascii_lowercase()));

        // defn_ranges may exist without rows for a symbol; mentions cover the gap
        let location_columns = if self.has_defn_ranges {
            format!(
                r#"
                COALESCE(
                    (SELECT d.relative_path FROM defn_ranges r
                     LEFT JOIN documents d ON d.id = r.document_id
                     WHERE r.symbol_id = s.id ORDER BY r.rowid LIMIT 1),
                    {MENTION_DEFINITION_PATH}
                ) AS file_path,
                (SELECT r.start_line FROM defn_ranges r
                 WHERE r.symbol_id = s.id ORDER BY r.rowid LIMIT 1) AS line
                "#
            )
        } else {
            format!("{MENTION_DEFINITION_PATH} AS file_path, NULL AS line")
        };

        let sql = format!(
            r#"
            SELECT s.symbol, s.display_name, s.kind, {location_columns}
            FROM symbols s
            WHERE lower(s.symbol) LIKE ?1 ESCAPE '\'
               OR lower(s.display_name) LIKE ?1 ESCAPE '\'
            ORDER BY
                CASE
                    WHEN s.display_name = ?2 THEN 0
                    WHEN s.symbol = ?2 THEN 1
                    ELSE 2
                END,
                s.symbol
            LIMIT ?3
            "#
        );

        let rows = sqlx::query_as::<_, SearchRow>(&sql)
            .bind(&pattern)
            .bind(query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(query, results = rows.len(), "symbol search");

        Ok(rows
            .into_iter()
            .map(|row| SymbolMatch {
                name: row.display_name.unwrap_or_else(|| row.symbol.clone()),
                kind: SymbolKind::from_scip(row.kind),
                file_path: row.file_path,
                line: row.line.map(to_position),
                symbol: row.symbol,
            })
            .collect())
    }

    // ==================== Definitions ====================

    /// Resolve a symbol and its definition site.
    pub async fn get_definition(&self, symbol: &str) -> Result<Symbol, QueryError> {
        if let Some(cached) = self.cache.get(symbol) {
            return Ok(cached);
        }

        let row = self.symbol_row(symbol).await?;

        let mut location = self.fast_definition(row.id).await?;
        if location.is_none() {
            debug!(symbol, "no precomputed definition range, scanning chunks");
            location = self.scan_definition(row.id, symbol).await?;
        }

        let resolved = Symbol {
            kind: SymbolKind::from_scip(row.kind),
            documentation: parse_documentation(row.documentation.as_deref()),
            symbol: row.symbol,
            display_name: row.display_name,
            enclosing_symbol: row.enclosing_symbol.filter(|s| !s.is_empty()),
            location,
        };

        self.cache.add(resolved.clone());
        debug!(symbol, cached = self.cache.len(), "resolved definition");
        Ok(resolved)
    }

    async fn symbol_row(&self, symbol: &str) -> Result<SymbolRow, QueryError> {
        sqlx::query_as::<_, SymbolRow>(
            r#"
            SELECT id, symbol, display_name, kind, documentation, enclosing_symbol
            FROM symbols WHERE symbol = ?
            "#,
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| QueryError::SymbolNotFound(symbol.to_string()))
    }

    async fn fast_definition(&self, symbol_id: i64) -> Result<Option<Location>, QueryError> {
        if !self.has_defn_ranges {
            return Ok(None);
        }

        let row = sqlx::query_as::<_, DefnRangeRow>(
            r#"
            SELECT d.relative_path, r.start_line, r.start_char, r.end_line, r.end_char
            FROM defn_ranges r
            LEFT JOIN documents d ON d.id = r.document_id
            WHERE r.symbol_id = ?
            ORDER BY r.rowid
            LIMIT 1
            "#,
        )
        .bind(symbol_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Location {
            file_path: r.relative_path,
            start_line: to_position(r.start_line),
            start_col: to_position(r.start_char),
            end_line: to_position(r.end_line),
            end_col: to_position(r.end_char),
        }))
    }

    async fn scan_definition(&self, symbol_id: i64, symbol: &str) -> Result<Option<Location>, QueryError> {
        let chunks = sqlx::query_as::<_, ChunkRow>(
            r#"
            SELECT c.id, d.relative_path, c.occurrences
            FROM chunks c
            LEFT JOIN documents d ON d.id = c.document_id
            WHERE c.id IN (
                SELECT chunk_id FROM mentions WHERE symbol_id = ? AND (role & 1) != 0
            )
            ORDER BY c.document_id, c.chunk_index
            "#,
        )
        .bind(symbol_id)
        .fetch_all(&self.pool)
        .await?;

        for chunk in chunks {
            for occurrence in decode_occurrences(&chunk.occurrences)? {
                if occurrence.symbol == symbol && is_definition(occurrence.symbol_roles) {
                    let range = Range::from_scip(&occurrence.range)?;
                    return Ok(Some(location(chunk.relative_path, range)));
                }
            }
        }
        Ok(None)
    }

    // ==================== References ====================

    /// Every non-definition occurrence of `symbol`.
    pub async fn get_references(&self, symbol: &str) -> Result<Vec<Reference>, QueryError> {
        let symbol_id: i64 = sqlx::query_scalar("SELECT id FROM symbols WHERE symbol = ?")
            .bind(symbol)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| QueryError::SymbolNotFound(symbol.to_string()))?;

        let chunks = sqlx::query_as::<_, ChunkRow>(
            r#"
            SELECT c.id, d.relative_path, c.occurrences
            FROM chunks c
            LEFT JOIN documents d ON d.id = c.document_id
            WHERE c.id IN (SELECT chunk_id FROM mentions WHERE symbol_id = ?)
            ORDER BY d.relative_path, c.chunk_index
            "#,
        )
        .bind(symbol_id)
        .fetch_all(&self.pool)
        .await?;

        let mut references = Vec::new();
        for chunk in chunks {
            for occurrence in decode_occurrences(&chunk.occurrences)? {
                if occurrence.symbol != symbol || is_definition(occurrence.symbol_roles) {
                    continue;
                }
                let range = Range::from_scip(&occurrence.range)?;
                references.push(Reference {
                    symbol: occurrence.symbol.clone(),
                    location: location(chunk.relative_path.clone(), range),
                    role: role_label(occurrence.symbol_roles).to_string(),
                });
            }
        }

        debug!(symbol, references = references.len(), "resolved references");
        Ok(references)
    }

    // ==================== Files ====================

    /// Symbols defined in the document at `path`, ordered by line then identifier.
    pub async fn get_symbols_in_file(&self, path: &str) -> Result<Vec<FileSymbol>, QueryError> {
        let document_ids: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM documents WHERE relative_path = ? ORDER BY id")
                .bind(path)
                .fetch_all(&self.pool)
                .await?;

        let mut symbols = Vec::new();
        for document_id in document_ids {
            let mut found = self.fast_file_symbols(document_id, path).await?;
            if found.is_empty() {
                debug!(path, document_id, "no precomputed definition ranges, scanning chunks");
                found = self.scan_file_symbols(document_id, path).await?;
            }
            symbols.extend(found);
        }

        symbols.sort_by(|a, b| {
            a.location
                .start_line
                .cmp(&b.location.start_line)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        Ok(symbols)
    }

    async fn fast_file_symbols(&self, document_id: i64, path: &str) -> Result<Vec<FileSymbol>, QueryError> {
        if !self.has_defn_ranges {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, FileDefnRow>(
            r#"
            SELECT s.symbol, s.display_name, s.kind,
                   r.start_line, r.start_char, r.end_line, r.end_char
            FROM defn_ranges r
            JOIN symbols s ON s.id = r.symbol_id
            WHERE r.document_id = ?
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| FileSymbol {
                name: row.display_name.unwrap_or_else(|| row.symbol.clone()),
                kind: SymbolKind::from_scip(row.kind),
                location: Location {
                    file_path: Some(path.to_string()),
                    start_line: to_position(row.start_line),
                    start_col: to_position(row.start_char),
                    end_line: to_position(row.end_line),
                    end_col: to_position(row.end_char),
                },
                symbol: row.symbol,
            })
            .collect())
    }

    async fn scan_file_symbols(&self, document_id: i64, path: &str) -> Result<Vec<FileSymbol>, QueryError> {
        let blobs: Vec<Vec<u8>> = sqlx::query_scalar(
            "SELECT occurrences FROM chunks WHERE document_id = ? ORDER BY chunk_index",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        // First definition wins per symbol
        let mut definitions: HashMap<String, Range> = HashMap::new();
        for blob in blobs {
            for occurrence in decode_occurrences(&blob)? {
                if !is_definition(occurrence.symbol_roles) || occurrence.symbol.is_empty() {
                    continue;
                }
                let range = Range::from_scip(&occurrence.range)?;
                definitions.entry(occurrence.symbol).or_insert(range);
            }
        }

        if definitions.is_empty() {
            return Ok(Vec::new());
        }

        let ids: BTreeSet<&str> = definitions.keys().map(String::as_str).collect();
        let metadata = self.symbol_rows(&ids).await?;

        Ok(definitions
            .iter()
            .map(|(symbol, range)| {
                let row = metadata.get(symbol);
                let display_name = row.and_then(|r| r.display_name.clone());
                FileSymbol {
                    symbol: symbol.clone(),
                    name: display_name.unwrap_or_else(|| symbol.clone()),
                    kind: SymbolKind::from_scip(row.and_then(|r| r.kind)),
                    location: location(Some(path.to_string()), *range),
                }
            })
            .collect())
    }

    /// Load metadata for many symbols in one query.
    async fn symbol_rows(&self, symbols: &BTreeSet<&str>) -> Result<HashMap<String, SymbolRow>, QueryError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, symbol, display_name, kind, documentation, enclosing_symbol FROM symbols WHERE symbol IN (",
        );
        let mut separated = builder.separated(", ");
        for symbol in symbols {
            separated.push_bind(symbol.to_string());
        }
        separated.push_unseparated(")");

        let rows = builder
            .build_query_as::<SymbolRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|r| (r.symbol.clone(), r)).collect())
    }

    // ==================== Stats & Types ====================

    /// Row counts for documents, symbols and mentions.
    pub async fn get_stats(&self) -> Result<StoreStats, QueryError> {
        let documents: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        let symbols: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM symbols")
            .fetch_one(&self.pool)
            .await?;
        let mentions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM mentions")
            .fetch_one(&self.pool)
            .await?;

        Ok(StoreStats {
            documents,
            symbols,
            mentions,
        })
    }

    /// The rendered signature of `symbol`, or an empty string when it has none.
    pub async fn get_type_info(&self, symbol: &str) -> Result<String, QueryError> {
        let signature: Option<Option<Vec<u8>>> =
            sqlx::query_scalar("SELECT signature FROM symbols WHERE symbol = ?")
                .bind(symbol)
                .fetch_optional(&self.pool)
                .await?;

        match signature {
            None => Err(QueryError::SymbolNotFound(symbol.to_string())),
            Some(None) => Ok(String::new()),
            Some(Some(blob)) => Ok(decode_signature(&blob)?),
        }
    }

    /// Close all pooled connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn location(file_path: Option<String>, range: Range) -> Location {
    Location {
        file_path,
        start_line: range.start_line,
        start_col: range.start_col,
        end_line: range.end_line,
        end_col: range.end_col,
    }
}

/// Escape LIKE wildcards (`%`, `_`) and the escape character itself.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
