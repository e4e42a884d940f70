//! Database schema definitions
//!
//! This module contains the SQL schema for the scrape history database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per finished crawl
CREATE TABLE IF NOT EXISTS scrape_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    title TEXT NOT NULL,
    scraped_at TEXT NOT NULL,
    success INTEGER NOT NULL,
    error_message TEXT,
    status TEXT NOT NULL,
    pages_fetched INTEGER NOT NULL DEFAULT 0,
    truncated INTEGER NOT NULL DEFAULT 0,
    config_hash TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_scrape_history_scraped_at ON scrape_history(scraped_at);
CREATE INDEX IF NOT EXISTS idx_scrape_history_url ON scrape_history(url);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
