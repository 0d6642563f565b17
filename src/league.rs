#[cfg(feature = "python")]
use pyo3::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DataError;
use crate::team::{parse_field, StatRecord};

/// League-wide average rates used as the neutral reference point.
///
/// Rates are fractions; `ppg` is points per 100 possessions (mean `ADJOE`).
#[cfg_attr(feature = "python", pyclass(get_all))]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeagueBaseline {
    pub efg_pct: f64,
    pub tov_pct: f64,
    pub orb_pct: f64,
    pub ftr: f64,
    pub ppg: f64,
    /// Teams that contributed to the averages
    pub team_count: usize,
}

impl LeagueBaseline {
    /// Look up a baseline stat by its column-style name.
    pub fn get(&self, stat: &str) -> Option<f64> {
        match stat {
            "eFG_pct" => Some(self.efg_pct),
            "TOV_pct" => Some(self.tov_pct),
            "ORB_pct" => Some(self.orb_pct),
            "FTR" => Some(self.ftr),
            "PPG" => Some(self.ppg),
            _ => None,
        }
    }
}

/// Source columns, all on a 0-100 scale.
const BASELINE_COLUMNS: [&str; 5] = ["EFG_O", "TOR", "ORB", "FTR", "ADJOE"];

/// Average the season's ratings rows into a [`LeagueBaseline`].
///
/// Rows with a missing, non-numeric or negative column are skipped and left
/// out of the denominator. Zero usable rows, or a non-positive mean `ADJOE`,
/// is an error.
pub fn league_baseline(rows: &[StatRecord]) -> Result<LeagueBaseline, DataError> {
    let mut totals = [0.0; 5];
    let mut team_count = 0usize;

    for row in rows {
        let team = row.get("TEAM").map(String::as_str).unwrap_or("N/A");
        let parsed: Result<Vec<f64>, DataError> = BASELINE_COLUMNS
            .iter()
            .map(|column| {
                parse_field(row, team, column).and_then(|value| {
                    if value.is_finite() && value >= 0.0 {
                        Ok(value)
                    } else {
                        Err(DataError::OutOfRange {
                            team: team.to_string(),
                            field: column.to_string(),
                            value,
                        })
                    }
                })
            })
            .collect();

        match parsed {
            Ok(values) => {
                for (total, value) in totals.iter_mut().zip(values) {
                    *total += value;
                }
                team_count += 1;
            }
            Err(err) => debug!(team, error = %err, "skipping team in league averages"),
        }
    }

    if team_count == 0 {
        return Err(DataError::EmptyLeague);
    }

    let n = team_count as f64;
    let ppg = totals[4] / n;
    if ppg <= 0.0 {
        return Err(DataError::OutOfRange {
            team: "league".to_string(),
            field: "ADJOE".to_string(),
            value: ppg,
        });
    }
    let baseline = LeagueBaseline {
        efg_pct: totals[0] / n / 100.0,
        tov_pct: totals[1] / n / 100.0,
        orb_pct: totals[2] / n / 100.0,
        ftr: totals[3] / n / 100.0,
        ppg,
        team_count,
    };
    debug!(?baseline, "league averages computed");
    Ok(baseline)
}
