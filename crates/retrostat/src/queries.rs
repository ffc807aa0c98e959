// Parameterized SQL for the season statistics.
//
// Every query binds the player id as `?1` and the inclusive date bounds as
// `?2`/`?3`. Only the table name is spliced in, and it is derived from an
// integer season.

/// Name of the table holding `season`'s plays.
pub fn table_name(season: i32) -> String {
    format!("plays{season}")
}

/// Batter-side counts the rate statistics are built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattingCount {
    /// Plays that count as an at-bat.
    AtBats,
    /// At-bats ending in a single, double, triple or home run.
    Hits,
    /// Hits, walks, intentional walks and hit-by-pitches.
    TimesOnBase,
    /// At-bats plus walks, intentional walks, hit-by-pitches and sacrifice flies.
    PlateAppearances,
}

impl BattingCount {
    /// Row predicate, in addition to the player and date filters.
    pub fn predicate(self) -> &'static str {
        match self {
            BattingCount::AtBats => "ab = 1",
            BattingCount::Hits => {
                "ab = 1 AND (single = 1 OR \"double\" = 1 OR triple = 1 OR hr = 1)"
            }
            BattingCount::TimesOnBase => {
                "single = 1 OR \"double\" = 1 OR triple = 1 OR hr = 1 \
                 OR walk = 1 OR iw = 1 OR hbp = 1"
            }
            BattingCount::PlateAppearances => {
                "ab = 1 OR walk = 1 OR iw = 1 OR hbp = 1 OR sf = 1"
            }
        }
    }

    pub fn sql(self, season: i32) -> String {
        format!(
            "SELECT COUNT(*) FROM {table}
             WHERE batter = ?1
               AND ({predicate})
               AND date BETWEEN ?2 AND ?3",
            table = table_name(season),
            predicate = self.predicate(),
        )
    }
}

/// Summed outs recorded and earned runs charged for a pitcher.
///
/// A run is charged when the pitcher is responsible for the runner and the
/// run is not flagged unearned. The batter-runner branch also requires
/// `run_b` to be present; the base-runner branches do not.
pub fn pitching_totals_sql(season: i32) -> String {
    format!(
        "SELECT
            SUM(outs_post - outs_pre) AS outs,
            SUM(
                CASE WHEN prun_b = ?1 AND run_b IS NOT NULL AND ur_b = 0 THEN 1 ELSE 0 END +
                CASE WHEN prun1 = ?1 AND ur1 = 0 THEN 1 ELSE 0 END +
                CASE WHEN prun2 = ?1 AND ur2 = 0 THEN 1 ELSE 0 END +
                CASE WHEN prun3 = ?1 AND ur3 = 0 THEN 1 ELSE 0 END
            ) AS earned_runs
         FROM {table}
         WHERE pitcher = ?1
           AND date BETWEEN ?2 AND ?3",
        table = table_name(season),
    )
}
