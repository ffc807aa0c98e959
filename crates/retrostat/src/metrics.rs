// Metric engine: batting average, on-base percentage and earned run average
// over an inclusive date range within one season.
//
// Each query:
// 1. Validates the range (no I/O on failure)
// 2. Provisions the season's files if its directory is missing
// 3. Loads the season table into the store if the catalog lacks it
// 4. Runs the aggregate and applies the zero-denominator rule
//
// Steps 2 and 3 are memoized per season for the life of the engine. The
// directory check and the fetch are not atomic, nor are the catalog check and
// the load; two engines sharing a data root or store file can duplicate work.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{Config, MAX_PRECISION};
use crate::error::StatsError;
use crate::provision::{plays_csv_path, season_dir, Provisioner, RetrosheetProvisioner};
use crate::queries::{pitching_totals_sql, BattingCount};
use crate::range::DateRange;
use crate::store::Store;

/// Decimal places used when the caller has no preference.
pub const DEFAULT_PRECISION: u32 = 3;

const OUTS_PER_INNING: f64 = 3.0;
const INNINGS_PER_GAME: f64 = 9.0;

/// The statistics the engine computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    BattingAverage,
    OnBasePercentage,
    EarnedRunAverage,
}

impl Statistic {
    /// Short conventional abbreviation.
    pub fn abbreviation(self) -> &'static str {
        match self {
            Statistic::BattingAverage => "AVG",
            Statistic::OnBasePercentage => "OBP",
            Statistic::EarnedRunAverage => "ERA",
        }
    }
}

/// Round `value` to `precision` decimal places, ties away from zero.
///
/// Precisions beyond what an f64 can represent return `value` unchanged.
pub fn round_to(value: f64, precision: u32) -> f64 {
    if precision > MAX_PRECISION {
        return value;
    }
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

/// `numerator / denominator` rounded, or `None` when the denominator is zero.
fn rounded_ratio(numerator: i64, denominator: i64, precision: u32) -> Option<f64> {
    if denominator == 0 {
        return None;
    }
    Some(round_to(numerator as f64 / denominator as f64, precision))
}

// ---------------------------------------------------------------------------
// MetricEngine
// ---------------------------------------------------------------------------

/// Computes player statistics from season play-by-play tables.
///
/// Owns the analytical store and the provisioner; results are `Ok(None)`
/// when no qualifying events exist.
pub struct MetricEngine<P> {
    store: Store,
    provisioner: P,
    data_root: PathBuf,
    ready_seasons: HashSet<i32>,
}

impl MetricEngine<RetrosheetProvisioner> {
    /// Build an engine backed by the Retrosheet provisioner and the store
    /// described in `config`.
    pub fn from_config(config: &Config) -> Result<Self, StatsError> {
        let store = Store::open(&config.store.path)?;
        let provisioner = RetrosheetProvisioner::from_config(&config.provisioner)?;
        Ok(Self::new(store, provisioner, config.data.root.clone()))
    }
}

impl<P: Provisioner> MetricEngine<P> {
    pub fn new(store: Store, provisioner: P, data_root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            provisioner,
            data_root: data_root.into(),
            ready_seasons: HashSet::new(),
        }
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn provisioner(&self) -> &P {
        &self.provisioner
    }

    /// Release the store and provisioner.
    pub fn into_parts(self) -> (Store, P) {
        (self.store, self.provisioner)
    }

    /// Compute `stat` for `player_id` between `start` and `end` inclusive.
    pub fn compute(
        &mut self,
        stat: Statistic,
        player_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        precision: u32,
    ) -> Result<Option<f64>, StatsError> {
        match stat {
            Statistic::BattingAverage => self.batting_average(player_id, start, end, precision),
            Statistic::OnBasePercentage => {
                self.on_base_percentage(player_id, start, end, precision)
            }
            Statistic::EarnedRunAverage => {
                self.earned_run_average(player_id, start, end, precision)
            }
        }
    }

    /// Hits per at-bat.
    pub fn batting_average(
        &mut self,
        player_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        precision: u32,
    ) -> Result<Option<f64>, StatsError> {
        let range = self.prepare(start, end)?;
        let hits = self.batting_count(BattingCount::Hits, player_id, &range)?;
        let at_bats = self.batting_count(BattingCount::AtBats, player_id, &range)?;
        debug!("AVG {}: {}/{} over {:?}", player_id, hits, at_bats, range);
        Ok(rounded_ratio(hits, at_bats, precision))
    }

    /// Times on base per plate appearance (at-bats, walks, hit-by-pitches
    /// and sacrifice flies).
    pub fn on_base_percentage(
        &mut self,
        player_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        precision: u32,
    ) -> Result<Option<f64>, StatsError> {
        let range = self.prepare(start, end)?;
        let on_base = self.batting_count(BattingCount::TimesOnBase, player_id, &range)?;
        let appearances = self.batting_count(BattingCount::PlateAppearances, player_id, &range)?;
        debug!("OBP {}: {}/{} over {:?}", player_id, on_base, appearances, range);
        Ok(rounded_ratio(on_base, appearances, precision))
    }

    /// Earned runs charged per nine innings pitched.
    ///
    /// `None` when the pitcher has no rows in range, or their rows record no
    /// outs.
    pub fn earned_run_average(
        &mut self,
        player_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        precision: u32,
    ) -> Result<Option<f64>, StatsError> {
        let range = self.prepare(start, end)?;
        let totals = self.store.pitching_totals(
            &pitching_totals_sql(range.season()),
            player_id,
            &range.sql_bounds(),
        )?;
        debug!("ERA {}: {:?} over {:?}", player_id, totals, range);

        let (Some(outs), Some(earned_runs)) = (totals.outs, totals.earned_runs) else {
            return Ok(None);
        };
        if outs == 0 {
            return Ok(None);
        }
        let innings = outs as f64 / OUTS_PER_INNING;
        let era = (earned_runs as f64 / innings) * INNINGS_PER_GAME;
        Ok(Some(round_to(era, precision)))
    }

    // ------------------------------------------------------------------
    // Season materialization
    // ------------------------------------------------------------------

    /// Validate the range, then make sure its season is queryable.
    fn prepare(&mut self, start: NaiveDate, end: NaiveDate) -> Result<DateRange, StatsError> {
        let range = DateRange::new(start, end)?;
        self.ensure_season(range.season())?;
        Ok(range)
    }

    /// Provision and load `season` unless this engine already has.
    pub fn ensure_season(&mut self, season: i32) -> Result<(), StatsError> {
        if self.ready_seasons.contains(&season) {
            debug!("season {} already loaded", season);
            return Ok(());
        }

        let dir = season_dir(&self.data_root, season);
        if !dir.exists() {
            info!("No local data for season {}, provisioning", season);
            self.provisioner.provision(season, &dir)?;
        }

        if !self.store.has_season(season)? {
            let csv_path = plays_csv_path(&self.data_root, season);
            self.store.load_season(season, &csv_path)?;
        }

        self.ready_seasons.insert(season);
        Ok(())
    }

    fn batting_count(
        &self,
        count: BattingCount,
        player_id: &str,
        range: &DateRange,
    ) -> Result<i64, StatsError> {
        let n = self
            .store
            .count(&count.sql(range.season()), player_id, &range.sql_bounds())?;
        Ok(n)
    }
}
