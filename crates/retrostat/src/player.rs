// Player-facing API over the metric engine.

use chrono::NaiveDate;

use crate::error::StatsError;
use crate::metrics::{MetricEngine, Statistic};
use crate::provision::Provisioner;

/// A player identified by their Retrosheet id (e.g. `"judga001"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Player {
    id: String,
}

impl Player {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Batting average across games between `start` and `end` inclusive.
    pub fn avg<P: Provisioner>(
        &self,
        engine: &mut MetricEngine<P>,
        start: NaiveDate,
        end: NaiveDate,
        precision: u32,
    ) -> Result<Option<f64>, StatsError> {
        engine.batting_average(&self.id, start, end, precision)
    }

    /// On-base percentage across games between `start` and `end` inclusive.
    pub fn obp<P: Provisioner>(
        &self,
        engine: &mut MetricEngine<P>,
        start: NaiveDate,
        end: NaiveDate,
        precision: u32,
    ) -> Result<Option<f64>, StatsError> {
        engine.on_base_percentage(&self.id, start, end, precision)
    }

    /// Earned run average across games between `start` and `end` inclusive.
    pub fn era<P: Provisioner>(
        &self,
        engine: &mut MetricEngine<P>,
        start: NaiveDate,
        end: NaiveDate,
        precision: u32,
    ) -> Result<Option<f64>, StatsError> {
        engine.earned_run_average(&self.id, start, end, precision)
    }

    pub fn stat<P: Provisioner>(
        &self,
        engine: &mut MetricEngine<P>,
        stat: Statistic,
        start: NaiveDate,
        end: NaiveDate,
        precision: u32,
    ) -> Result<Option<f64>, StatsError> {
        engine.compute(stat, &self.id, start, end, precision)
    }
}

impl From<&str> for Player {
    fn from(id: &str) -> Self {
        Player::new(id)
    }
}
