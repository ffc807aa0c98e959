// Integration tests for the metric engine.
//
// These tests drive the public API end-to-end against a fixture season: a
// counting provisioner copies `tests/fixtures/2023plays.csv` into a temporary
// data root, the engine loads it into an in-memory store, and each statistic
// is checked against hand-computed values.

use std::cell::Cell;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use retrostat::config::ProvisionerConfig;
use retrostat::provision::{plays_csv_path, season_dir, Provisioner, RetrosheetProvisioner};
use retrostat::store::Store;
use retrostat::{
    DateRange, MetricEngine, Player, ProvisionError, Statistic, StatsError, DEFAULT_PRECISION,
};

// ===========================================================================
// Test helpers
// ===========================================================================

/// Fixture directory path (relative to the crate root, which is the cwd for
/// `cargo test`).
const FIXTURES: &str = "tests/fixtures";

/// Provisioner that installs the fixture plays file and counts invocations.
struct FixtureProvisioner {
    calls: Cell<usize>,
}

impl FixtureProvisioner {
    fn new() -> Self {
        Self {
            calls: Cell::new(0),
        }
    }
}

impl Provisioner for FixtureProvisioner {
    fn provision(&self, season: i32, dest: &Path) -> Result<(), ProvisionError> {
        self.calls.set(self.calls.get() + 1);
        let io_err = |source| ProvisionError::Io {
            path: dest.to_path_buf(),
            source,
        };
        std::fs::create_dir_all(dest).map_err(io_err)?;
        std::fs::copy(
            Path::new(FIXTURES).join("2023plays.csv"),
            dest.join(format!("{season}plays.csv")),
        )
        .map_err(io_err)?;
        Ok(())
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// The fixture season, January 1 through December 31.
fn fixture_season() -> DateRange {
    DateRange::full_season(2023).unwrap()
}

fn season_start() -> NaiveDate {
    fixture_season().start()
}

fn season_end() -> NaiveDate {
    fixture_season().end()
}

/// Write a plays file for `season` under `root`, so no provisioning is needed.
/// Each row is `(batter, date, ab, single)`.
fn write_season(root: &Path, season: i32, rows: &[(&str, &str, u8, u8)]) {
    let mut body = String::from("batter,pitcher,date,ab,single\n");
    for (batter, day, ab, single) in rows {
        body.push_str(&format!("{batter},X1,{day},{ab},{single}\n"));
    }
    std::fs::create_dir_all(season_dir(root, season)).unwrap();
    std::fs::write(plays_csv_path(root, season), body).unwrap();
}

/// Fresh engine over an empty temporary data root. The `TempDir` must be
/// kept alive for the duration of the test.
fn test_engine() -> (tempfile::TempDir, MetricEngine<FixtureProvisioner>) {
    let root = tempfile::tempdir().unwrap();
    let engine = MetricEngine::new(
        Store::open_in_memory().unwrap(),
        FixtureProvisioner::new(),
        root.path(),
    );
    (root, engine)
}

fn all_stats() -> [Statistic; 3] {
    [
        Statistic::BattingAverage,
        Statistic::OnBasePercentage,
        Statistic::EarnedRunAverage,
    ]
}

// ===========================================================================
// Batting average
// ===========================================================================

#[test]
fn batting_average_over_full_season() {
    let (_root, mut engine) = test_engine();
    // 4 at-bats, 2 singles; the walk is not an at-bat.
    let avg = engine
        .batting_average("P1", season_start(), season_end(), 3)
        .unwrap();
    assert_eq!(avg, Some(0.5));
}

#[test]
fn batting_average_respects_inclusive_bounds() {
    let (_root, mut engine) = test_engine();
    let first_two = engine
        .batting_average("P1", date(2023, 4, 1), date(2023, 4, 2), 3)
        .unwrap();
    assert_eq!(first_two, Some(1.0));

    let last_two = engine
        .batting_average("P1", date(2023, 4, 3), date(2023, 4, 4), 3)
        .unwrap();
    assert_eq!(last_two, Some(0.0));
}

#[test]
fn batting_average_without_at_bats_is_undefined() {
    let (_root, mut engine) = test_engine();
    // Only a walk falls in this window.
    let avg = engine
        .batting_average("P1", date(2023, 4, 5), date(2023, 4, 30), 3)
        .unwrap();
    assert_eq!(avg, None);
}

#[test]
fn previous_season_rows_are_not_counted() {
    let (_root, mut engine) = test_engine();
    // The fixture's 2022 row is a hit for P1; it must not reach plays2023.
    let avg = engine
        .batting_average("P1", date(2023, 1, 1), date(2023, 3, 31), 3)
        .unwrap();
    assert_eq!(avg, None);
}

#[test]
fn batting_average_counts_doubles_triples_and_home_runs() {
    let (_root, mut engine) = test_engine();
    // Double, triple and home run in 4 at-bats.
    let avg = engine
        .batting_average("P6", season_start(), season_end(), 3)
        .unwrap();
    assert_eq!(avg, Some(0.75));

    for (day, expected) in [(10, 1.0), (11, 1.0), (12, 1.0), (13, 0.0)] {
        let single_day = date(2023, 8, day);
        let avg = engine
            .batting_average("P6", single_day, single_day, 3)
            .unwrap();
        assert_eq!(avg, Some(expected), "2023-08-{day}");
    }
}

// ===========================================================================
// On-base percentage
// ===========================================================================

#[test]
fn on_base_percentage_counts_extra_base_hits() {
    let (_root, mut engine) = test_engine();
    let obp = engine
        .on_base_percentage("P6", season_start(), season_end(), 3)
        .unwrap();
    assert_eq!(obp, Some(0.75));
}

#[test]
fn intentional_walk_counts_toward_on_base_percentage() {
    let (_root, mut engine) = test_engine();
    // Intentional walk plus two outs: on base once in three appearances.
    let obp = engine
        .on_base_percentage("P7", season_start(), season_end(), 3)
        .unwrap();
    assert_eq!(obp, Some(0.333));

    // The intentional walk is not an at-bat.
    let avg = engine
        .batting_average("P7", season_start(), season_end(), 3)
        .unwrap();
    assert_eq!(avg, Some(0.0));

    let walk_day = date(2023, 8, 15);
    let obp = engine
        .on_base_percentage("P7", walk_day, walk_day, 3)
        .unwrap();
    assert_eq!(obp, Some(1.0));
}

#[test]
fn on_base_percentage_counts_walks_hbp_and_sacrifice_flies() {
    let (_root, mut engine) = test_engine();
    // Single, walk, HBP on base; plus an out and a sacrifice fly in the
    // denominator.
    let obp = engine
        .on_base_percentage("P2", season_start(), season_end(), 3)
        .unwrap();
    assert_eq!(obp, Some(0.6));

    let avg = engine
        .batting_average("P2", season_start(), season_end(), 3)
        .unwrap();
    assert_eq!(avg, Some(0.5));
}

#[test]
fn on_base_percentage_defined_when_batting_average_is_not() {
    let (_root, mut engine) = test_engine();
    let start = date(2023, 4, 5);
    let end = date(2023, 4, 30);
    assert_eq!(engine.batting_average("P1", start, end, 3).unwrap(), None);
    assert_eq!(engine.on_base_percentage("P1", start, end, 3).unwrap(), Some(1.0));
}

// ===========================================================================
// Earned run average
// ===========================================================================

#[test]
fn earned_run_average_from_batter_runner_runs() {
    let (_root, mut engine) = test_engine();
    // 9 outs (3 innings), 2 earned runs: an unearned home run and a batter
    // who reached without scoring are excluded.
    let era = engine
        .earned_run_average("P3", season_start(), season_end(), 3)
        .unwrap();
    assert_eq!(era, Some(6.0));
}

#[test]
fn earned_run_average_over_partial_range() {
    let (_root, mut engine) = test_engine();
    // June 10: 3 outs, 2 earned runs.
    let era = engine
        .earned_run_average("P3", date(2023, 6, 10), date(2023, 6, 10), 3)
        .unwrap();
    assert_eq!(era, Some(18.0));
}

#[test]
fn base_runner_runs_need_no_scoring_flag() {
    let (_root, mut engine) = test_engine();
    // prun1 with ur1 = 0 counts; ur2 = 1 and a missing ur3 do not.
    let era = engine
        .earned_run_average("P4", season_start(), season_end(), 3)
        .unwrap();
    assert_eq!(era, Some(9.0));
}

#[test]
fn earned_run_average_with_no_earned_runs_is_zero() {
    let (_root, mut engine) = test_engine();
    let era = engine
        .earned_run_average("X1", season_start(), season_end(), 3)
        .unwrap();
    assert_eq!(era, Some(0.0));
}

#[test]
fn earned_run_average_without_outs_is_undefined() {
    let (_root, mut engine) = test_engine();
    let era = engine
        .earned_run_average("P5", season_start(), season_end(), 3)
        .unwrap();
    assert_eq!(era, None);
}

#[test]
fn earned_run_average_for_non_pitcher_is_undefined() {
    let (_root, mut engine) = test_engine();
    let era = engine
        .earned_run_average("P1", season_start(), season_end(), 3)
        .unwrap();
    assert_eq!(era, None);
}

// ===========================================================================
// Undefined results and errors
// ===========================================================================

#[test]
fn unknown_player_is_undefined_for_every_statistic() {
    let (_root, mut engine) = test_engine();
    for stat in all_stats() {
        let value = engine
            .compute(stat, "nobody01", season_start(), season_end(), 3)
            .unwrap();
        assert_eq!(value, None, "{stat:?}");
    }
}

#[test]
fn reversed_range_is_invalid_for_every_statistic() {
    let (root, mut engine) = test_engine();
    for stat in all_stats() {
        let err = engine
            .compute(stat, "P1", date(2023, 5, 1), date(2023, 4, 1), 3)
            .unwrap_err();
        assert!(matches!(err, StatsError::InvalidRange { .. }), "{stat:?}");
    }
    assert_eq!(engine.provisioner().calls.get(), 0);
    assert!(!season_dir(root.path(), 2023).exists());
}

#[test]
fn cross_year_range_is_rejected_for_every_statistic() {
    let (_root, mut engine) = test_engine();
    for stat in all_stats() {
        let err = engine
            .compute(stat, "P1", date(2022, 9, 1), date(2023, 4, 1), 3)
            .unwrap_err();
        assert!(matches!(err, StatsError::CrossYearRange { .. }), "{stat:?}");
    }
    assert_eq!(engine.provisioner().calls.get(), 0);
}

// ===========================================================================
// Provisioning and table caching
// ===========================================================================

#[test]
fn repeated_queries_reuse_the_loaded_season() {
    let (root, mut engine) = test_engine();
    let first = engine
        .batting_average("P1", season_start(), season_end(), 3)
        .unwrap();
    assert_eq!(engine.provisioner().calls.get(), 1);
    assert!(engine.store().has_season(2023).unwrap());

    // With the source gone, a second load would fail; a cache hit does not.
    std::fs::remove_file(plays_csv_path(root.path(), 2023)).unwrap();

    let second = engine
        .batting_average("P1", season_start(), season_end(), 3)
        .unwrap();
    assert_eq!(first, second);
    for stat in all_stats() {
        engine
            .compute(stat, "P3", season_start(), season_end(), 3)
            .unwrap();
    }
    assert_eq!(engine.provisioner().calls.get(), 1);
}

#[test]
fn failed_download_is_retried_on_next_query() {
    let root = tempfile::tempdir().unwrap();
    let config = ProvisionerConfig {
        url_template: "http://127.0.0.1:1/{year}csvs.zip".to_string(),
        timeout_secs: Some(5),
    };
    let mut engine = MetricEngine::new(
        Store::open_in_memory().unwrap(),
        RetrosheetProvisioner::from_config(&config).unwrap(),
        root.path(),
    );

    for attempt in 1..=2 {
        let err = engine
            .batting_average("P1", season_start(), season_end(), 3)
            .unwrap_err();
        assert!(
            matches!(err, StatsError::Provisioning(ProvisionError::Http { .. })),
            "attempt {attempt}: {err}"
        );
        assert!(!season_dir(root.path(), 2023).exists(), "attempt {attempt}");
        assert!(!root.path().join("2023.partial").exists(), "attempt {attempt}");
    }
}

#[test]
fn existing_season_directory_skips_provisioning() {
    let (root, mut engine) = test_engine();
    let dir = season_dir(root.path(), 2023);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::copy(
        PathBuf::from(FIXTURES).join("2023plays.csv"),
        plays_csv_path(root.path(), 2023),
    )
    .unwrap();

    let avg = engine
        .batting_average("P1", season_start(), season_end(), 3)
        .unwrap();
    assert_eq!(avg, Some(0.5));
    assert_eq!(engine.provisioner().calls.get(), 0);
}

#[test]
fn each_season_is_provisioned_once() {
    let (_root, mut engine) = test_engine();
    engine
        .batting_average("P1", season_start(), season_end(), 3)
        .unwrap();
    // 2024 receives the 2023 fixture, whose rows all fall outside the season.
    let next = engine
        .batting_average("P1", date(2024, 1, 1), date(2024, 12, 31), 3)
        .unwrap();
    assert_eq!(next, None);
    engine
        .on_base_percentage("P1", date(2024, 4, 1), date(2024, 4, 30), 3)
        .unwrap();

    assert_eq!(engine.provisioner().calls.get(), 2);
    assert!(engine.store().has_season(2023).unwrap());
    assert!(engine.store().has_season(2024).unwrap());
}

#[test]
fn new_engine_reuses_tables_in_a_shared_store_file() {
    let root = tempfile::tempdir().unwrap();
    let db_path = root.path().join("store.sqlite");
    let db_path = db_path.to_str().unwrap();

    let mut engine = MetricEngine::new(
        Store::open(db_path).unwrap(),
        FixtureProvisioner::new(),
        root.path(),
    );
    engine
        .batting_average("P1", season_start(), season_end(), 3)
        .unwrap();
    drop(engine);

    // The season directory exists and the table is already in the catalog,
    // so the plays file is never read again.
    std::fs::remove_file(plays_csv_path(root.path(), 2023)).unwrap();
    let mut engine = MetricEngine::new(
        Store::open(db_path).unwrap(),
        FixtureProvisioner::new(),
        root.path(),
    );
    let avg = engine
        .batting_average("P1", season_start(), season_end(), 3)
        .unwrap();
    assert_eq!(avg, Some(0.5));
    assert_eq!(engine.provisioner().calls.get(), 0);
}

// ===========================================================================
// Precision
// ===========================================================================

#[test]
fn precision_rounds_rather_than_truncates() {
    let (_root, mut engine) = test_engine();
    // 2 hits in 3 at-bats.
    let start = date(2023, 4, 1);
    let end = date(2023, 4, 3);
    assert_eq!(engine.batting_average("P1", start, end, 1).unwrap(), Some(0.7));
    assert_eq!(engine.batting_average("P1", start, end, 3).unwrap(), Some(0.667));
    assert_eq!(engine.batting_average("P1", start, end, 0).unwrap(), Some(1.0));
}

#[test]
fn decimal_tie_from_counts_rounds_away_from_zero() {
    let root = tempfile::tempdir().unwrap();
    // 469 hits in 2000 at-bats: .2345 lands on a tie at three places.
    let rows: Vec<(&str, &str, u8, u8)> = (0..2000)
        .map(|i| ("T1", "20190601", 1, u8::from(i < 469)))
        .collect();
    write_season(root.path(), 2019, &rows);

    let mut engine = MetricEngine::new(
        Store::open_in_memory().unwrap(),
        FixtureProvisioner::new(),
        root.path(),
    );
    let season = DateRange::full_season(2019).unwrap();
    let avg = engine
        .batting_average("T1", season.start(), season.end(), 3)
        .unwrap();
    assert_eq!(avg, Some(0.235));
    let avg = engine
        .batting_average("T1", season.start(), season.end(), 4)
        .unwrap();
    assert_eq!(avg, Some(0.2345));
    assert_eq!(engine.provisioner().calls.get(), 0);
}

// ===========================================================================
// Player API
// ===========================================================================

#[test]
fn player_methods_delegate_to_engine() {
    let (_root, mut engine) = test_engine();
    let start = season_start();
    let end = season_end();

    let p1 = Player::new("P1");
    assert_eq!(p1.id(), "P1");
    assert_eq!(p1.avg(&mut engine, start, end, DEFAULT_PRECISION).unwrap(), Some(0.5));

    let p2 = Player::from("P2");
    assert_eq!(p2.obp(&mut engine, start, end, DEFAULT_PRECISION).unwrap(), Some(0.6));

    let p3 = Player::new(String::from("P3"));
    assert_eq!(p3.era(&mut engine, start, end, DEFAULT_PRECISION).unwrap(), Some(6.0));
    assert_eq!(
        p3.stat(&mut engine, Statistic::EarnedRunAverage, start, end, 1)
            .unwrap(),
        Some(6.0)
    );
}
