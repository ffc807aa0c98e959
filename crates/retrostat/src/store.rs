// SQLite-backed analytical store holding one play-by-play table per season.
//
// Tables are created from the season's plays CSV, never modified after the
// load, and queried with bound parameters only.

use std::io::Read;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use rusqlite::{params, Connection};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::queries::table_name;
use crate::range::SQL_DATE_FORMAT;

/// Aggregates of a pitcher's rows used to derive earned run average.
/// Both are `None` when no row matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PitchingTotals {
    pub outs: Option<i64>,
    pub earned_runs: Option<i64>,
}

/// Row counts from a season table load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub rows_loaded: usize,
    pub rows_skipped: usize,
}

// ---------------------------------------------------------------------------
// Raw CSV row (private)
// ---------------------------------------------------------------------------

/// The subset of Retrosheet `plays.csv` columns the statistics read. Extra
/// columns are ignored; absent or empty cells deserialize to `None` and are
/// stored as NULL.
#[derive(Debug, Deserialize)]
struct RawPlay {
    #[serde(default)]
    batter: Option<String>,
    #[serde(default)]
    pitcher: Option<String>,
    date: String,
    #[serde(default)]
    ab: Option<i64>,
    #[serde(default)]
    single: Option<i64>,
    #[serde(default)]
    double: Option<i64>,
    #[serde(default)]
    triple: Option<i64>,
    #[serde(default)]
    hr: Option<i64>,
    #[serde(default)]
    walk: Option<i64>,
    #[serde(default)]
    iw: Option<i64>,
    #[serde(default)]
    hbp: Option<i64>,
    #[serde(default)]
    sf: Option<i64>,
    #[serde(default)]
    outs_pre: Option<i64>,
    #[serde(default)]
    outs_post: Option<i64>,
    #[serde(default)]
    prun_b: Option<String>,
    #[serde(default)]
    run_b: Option<String>,
    #[serde(default)]
    ur_b: Option<i64>,
    #[serde(default)]
    prun1: Option<String>,
    #[serde(default)]
    prun2: Option<String>,
    #[serde(default)]
    prun3: Option<String>,
    #[serde(default)]
    ur1: Option<i64>,
    #[serde(default)]
    ur2: Option<i64>,
    #[serde(default)]
    ur3: Option<i64>,
}

fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE {table} (
            batter    TEXT,
            pitcher   TEXT,
            date      TEXT NOT NULL,
            ab        INTEGER,
            single    INTEGER,
            \"double\"  INTEGER,
            triple    INTEGER,
            hr        INTEGER,
            walk      INTEGER,
            iw        INTEGER,
            hbp       INTEGER,
            sf        INTEGER,
            outs_pre  INTEGER,
            outs_post INTEGER,
            prun_b    TEXT,
            run_b     TEXT,
            ur_b      INTEGER,
            prun1     TEXT,
            prun2     TEXT,
            prun3     TEXT,
            ur1       INTEGER,
            ur2       INTEGER,
            ur3       INTEGER
        );
        CREATE INDEX idx_{table}_date ON {table}(date);"
    )
}

fn insert_sql(table: &str) -> String {
    format!(
        "INSERT INTO {table}
            (batter, pitcher, date, ab, single, \"double\", triple, hr, walk, iw, hbp, sf,
             outs_pre, outs_post, prun_b, run_b, ur_b, prun1, prun2, prun3, ur1, ur2, ur3)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                 ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23)"
    )
}

/// Parse a `YYYYMMDD` cell into a date within `season`.
fn parse_play_date(raw: &str, season: i32) -> Option<NaiveDate> {
    let date = NaiveDate::parse_from_str(raw.trim(), "%Y%m%d").ok()?;
    (date.year() == season).then_some(date)
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// In-process analytical store. Owns its SQLite connection; dropping the
/// store releases it.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) a store at `path`. Pass `":memory:"` for a
    /// process-local store.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::open(":memory:")
    }

    /// Whether a table named `name` exists in the catalog.
    pub fn table_exists(&self, name: &str) -> Result<bool, StoreError> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            params![name],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Whether the table for `season` has been loaded.
    pub fn has_season(&self, season: i32) -> Result<bool, StoreError> {
        self.table_exists(&table_name(season))
    }

    /// Create the `season` table from the plays CSV at `csv_path`.
    pub fn load_season(&mut self, season: i32, csv_path: &Path) -> Result<LoadSummary, StoreError> {
        let file = std::fs::File::open(csv_path).map_err(|e| StoreError::Io {
            path: csv_path.to_path_buf(),
            source: e,
        })?;
        let summary = self
            .load_season_from_reader(season, file)
            .map_err(|e| match e {
                LoadError::Csv(source) => StoreError::Csv {
                    path: csv_path.to_path_buf(),
                    source,
                },
                LoadError::Sqlite(e) => StoreError::Sqlite(e),
            })?;
        info!(
            "Loaded {} from {}: {} rows ({} skipped)",
            table_name(season),
            csv_path.display(),
            summary.rows_loaded,
            summary.rows_skipped
        );
        Ok(summary)
    }

    /// Create the `season` table from CSV read out of `rdr`.
    ///
    /// Runs in one transaction: a failed load leaves no table behind. Rows
    /// that fail to deserialize, or whose date is unparseable or outside
    /// `season`, are skipped with a warning.
    fn load_season_from_reader<R: Read>(
        &mut self,
        season: i32,
        rdr: R,
    ) -> Result<LoadSummary, LoadError> {
        let table = table_name(season);
        let tx = self.conn.transaction()?;
        tx.execute_batch(&create_table_sql(&table))?;

        let mut summary = LoadSummary::default();
        {
            let mut insert = tx.prepare(&insert_sql(&table))?;
            let mut reader = csv::Reader::from_reader(rdr);
            // Validate the header up front so an unreadable file fails the load.
            reader.headers().map_err(LoadError::Csv)?;

            for result in reader.deserialize::<RawPlay>() {
                let raw = match result {
                    Ok(raw) => raw,
                    Err(e) => {
                        warn!("skipping malformed play row in {}: {}", table, e);
                        summary.rows_skipped += 1;
                        continue;
                    }
                };
                let Some(date) = parse_play_date(&raw.date, season) else {
                    warn!(
                        "skipping play row in {} with date '{}' outside season {}",
                        table, raw.date, season
                    );
                    summary.rows_skipped += 1;
                    continue;
                };

                insert.execute(params![
                    raw.batter,
                    raw.pitcher,
                    date.format(SQL_DATE_FORMAT).to_string(),
                    raw.ab,
                    raw.single,
                    raw.double,
                    raw.triple,
                    raw.hr,
                    raw.walk,
                    raw.iw,
                    raw.hbp,
                    raw.sf,
                    raw.outs_pre,
                    raw.outs_post,
                    raw.prun_b,
                    raw.run_b,
                    raw.ur_b,
                    raw.prun1,
                    raw.prun2,
                    raw.prun3,
                    raw.ur1,
                    raw.ur2,
                    raw.ur3,
                ])?;
                summary.rows_loaded += 1;
            }
        }

        tx.commit()?;
        Ok(summary)
    }

    /// Run a `COUNT(*)` query bound to `(player, start, end)`.
    pub fn count(
        &self,
        sql: &str,
        player_id: &str,
        bounds: &(String, String),
    ) -> Result<i64, StoreError> {
        let count: i64 = self.conn.query_row(
            sql,
            params![player_id, bounds.0, bounds.1],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Run the pitching totals query bound to `(player, start, end)`.
    pub fn pitching_totals(
        &self,
        sql: &str,
        player_id: &str,
        bounds: &(String, String),
    ) -> Result<PitchingTotals, StoreError> {
        let totals = self.conn.query_row(
            sql,
            params![player_id, bounds.0, bounds.1],
            |row| {
                Ok(PitchingTotals {
                    outs: row.get(0)?,
                    earned_runs: row.get(1)?,
                })
            },
        )?;
        Ok(totals)
    }
}

/// Internal load failure, before the source path is attached.
#[derive(Debug)]
enum LoadError {
    Csv(csv::Error),
    Sqlite(rusqlite::Error),
}

impl From<rusqlite::Error> for LoadError {
    fn from(e: rusqlite::Error) -> Self {
        LoadError::Sqlite(e)
    }
}
