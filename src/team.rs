#[cfg(feature = "python")]
use pyo3::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::constants::{EFG_THREE_WEIGHT, FT_TRIP_FACTOR};
use crate::error::DataError;

/// One CSV-style row keyed by column name.
pub type StatRecord = HashMap<String, String>;

const TEAM_COLUMN: &str = "TEAM";
const ALLOWED_PREFIX: &str = "OPP_";

/// Season counting stats for one side of the ball.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoxTotals {
    pub fga: f64,
    pub fg: f64,
    pub fg2a: f64,
    pub fg2: f64,
    pub fg3a: f64,
    pub fg3: f64,
    pub fta: f64,
    pub ft: f64,
    pub orb: f64,
    pub drb: f64,
    pub tov: f64,
}

impl BoxTotals {
    const COLUMNS: [&'static str; 11] = [
        "FGA", "FG", "FG2A", "FG2", "FG3A", "FG3", "FTA", "FT", "ORB", "DRB", "TOV",
    ];

    fn from_record(record: &StatRecord, team: &str, prefix: &str) -> Result<Self, DataError> {
        let mut values = [0.0; 11];
        for (value, column) in values.iter_mut().zip(Self::COLUMNS) {
            *value = required(record, team, &format!("{prefix}{column}"))?;
        }
        let [fga, fg, fg2a, fg2, fg3a, fg3, fta, ft, orb, drb, tov] = values;
        Ok(BoxTotals {
            fga,
            fg,
            fg2a,
            fg2,
            fg3a,
            fg3,
            fta,
            ft,
            orb,
            drb,
            tov,
        })
    }

    fn validate(&self, team: &str, prefix: &str) -> Result<(), DataError> {
        let values = [
            self.fga, self.fg, self.fg2a, self.fg2, self.fg3a, self.fg3, self.fta, self.ft,
            self.orb, self.drb, self.tov,
        ];
        for (value, column) in values.into_iter().zip(Self::COLUMNS) {
            check_non_negative(team, &format!("{prefix}{column}"), value)?;
        }
        Ok(())
    }

    /// Estimated possessions: `FGA + 0.44 * FTA - ORB + TOV`.
    pub fn possessions(&self) -> f64 {
        self.fga + FT_TRIP_FACTOR * self.fta - self.orb + self.tov
    }

    /// Turnover, field goal attempt and free-throw-trip shares per possession,
    /// renormalized so the three sum to exactly 1.
    fn event_shares(&self, team: &str, possessions: f64) -> Result<EventShares, DataError> {
        let rate_tov = self.tov / possessions;
        let rate_fga = self.fga / possessions;
        let rate_ft_trip = FT_TRIP_FACTOR * self.fta / possessions;

        let total = rate_tov + rate_fga + rate_ft_trip;
        if total <= 0.0 {
            return Err(DataError::ZeroEventRate {
                team: team.to_string(),
            });
        }

        Ok(EventShares {
            turnover: rate_tov / total,
            fga: rate_fga / total,
            shooting_foul: rate_ft_trip / total,
        })
    }

    fn effective_fg_pct(&self) -> f64 {
        if self.fga > 0.0 {
            (self.fg + 0.5 * self.fg3) / self.fga
        } else {
            0.0
        }
    }
}

struct EventShares {
    turnover: f64,
    fga: f64,
    shooting_foul: f64,
}

/// Raw season totals for a team and for its opponents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawTeamStats {
    pub team: String,
    pub offense: BoxTotals,
    pub allowed: BoxTotals,
}

impl RawTeamStats {
    /// Parse `TEAM`, the offensive columns and their `OPP_`-prefixed
    /// allowed counterparts.
    pub fn from_record(record: &StatRecord) -> Result<Self, DataError> {
        let team = team_name(record)?;
        let offense = BoxTotals::from_record(record, &team, "")?;
        let allowed = BoxTotals::from_record(record, &team, ALLOWED_PREFIX)?;
        Ok(RawTeamStats {
            team,
            offense,
            allowed,
        })
    }
}

/// Externally computed adjusted-efficiency ratings for one team.
///
/// Percent columns (`DRB`, `FTRD`) are kept on their 0-100 scale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeamRatings {
    pub team: String,
    pub adjoe: f64,
    pub adjde: f64,
    pub adj_t: f64,
    pub barthag: f64,
    /// Offensive rebound percentage allowed
    pub drb: f64,
    /// Free throw rate allowed
    pub ftrd: f64,
    pub games: Option<f64>,
    pub wins: Option<f64>,
}

impl TeamRatings {
    pub fn from_record(record: &StatRecord) -> Result<Self, DataError> {
        let team = team_name(record)?;
        Ok(TeamRatings {
            adjoe: required(record, &team, "ADJOE")?,
            adjde: required(record, &team, "ADJDE")?,
            adj_t: required(record, &team, "ADJ_T")?,
            barthag: required(record, &team, "BARTHAG")?,
            drb: required(record, &team, "DRB")?,
            ftrd: required(record, &team, "FTRD")?,
            games: optional(record, &team, "G")?,
            wins: optional(record, &team, "W")?,
            team,
        })
    }

    fn validate(&self) -> Result<(), DataError> {
        let values = [
            ("ADJOE", self.adjoe),
            ("ADJDE", self.adjde),
            ("ADJ_T", self.adj_t),
            ("BARTHAG", self.barthag),
            ("DRB", self.drb),
            ("FTRD", self.ftrd),
        ];
        if !(0.0..=1.0).contains(&self.barthag) {
            return Err(self.out_of_range("BARTHAG", self.barthag));
        }
        if self.adj_t <= 0.0 {
            return Err(self.out_of_range("ADJ_T", self.adj_t));
        }
        for (column, value) in values {
            check_non_negative(&self.team, column, value)?;
        }
        Ok(())
    }

    fn out_of_range(&self, field: &str, value: f64) -> DataError {
        DataError::OutOfRange {
            team: self.team.clone(),
            field: field.to_string(),
            value,
        }
    }

    /// Season win percentage, when both games and wins are known.
    pub fn win_pct(&self) -> Option<f64> {
        match (self.games, self.wins) {
            (Some(games), Some(wins)) if games > 0.0 => Some(wins / games),
            _ => None,
        }
    }
}

/// Per-possession event rates and supporting rate stats for one team.
///
/// `p_turnover + p_fga + p_shooting_foul == 1`; every rate lies in [0, 1].
#[cfg_attr(feature = "python", pyclass(get_all))]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeamProfile {
    pub name: String,

    pub p_turnover: f64,
    pub p_fga: f64,
    pub p_shooting_foul: f64,

    /// Three point attempt rate (3PA / FGA)
    pub three_par: f64,
    pub two_p_pct: f64,
    pub three_p_pct: f64,
    pub ft_pct: f64,
    pub orb_pct: f64,

    pub def_efg_pct: f64,
    pub def_tov_pct: f64,
    pub def_orb_pct: f64,
    pub def_ftr: f64,

    /// Opponents' event shares, normalized like the offensive ones
    pub def_p_turnover: f64,
    pub def_p_fga: f64,
    pub def_p_shooting_foul: f64,

    pub poss_per_g: f64,
    pub adjoe: f64,
    pub adjde: f64,
    pub barthag: f64,
}

impl TeamProfile {
    pub fn p_fga_2(&self) -> f64 {
        self.p_fga * (1.0 - self.three_par)
    }

    pub fn p_fga_3(&self) -> f64 {
        self.p_fga * self.three_par
    }

    /// Effective field goal percentage implied by the team's shot mix.
    pub fn effective_fg_pct(&self) -> f64 {
        self.two_p_pct * (1.0 - self.three_par)
            + EFG_THREE_WEIGHT * self.three_p_pct * self.three_par
    }
}

/// Turn one team's raw totals and ratings into a [`TeamProfile`].
///
/// Fails with [`DataError`] on mismatched rows, invalid values, or a zero
/// possession estimate; the caller is expected to exclude such teams.
pub fn prepare(raw: &RawTeamStats, ratings: &TeamRatings) -> Result<TeamProfile, DataError> {
    if raw.team.trim() != ratings.team.trim() {
        return Err(DataError::TeamMismatch {
            raw: raw.team.clone(),
            ratings: ratings.team.clone(),
        });
    }
    let team = raw.team.trim();
    raw.offense.validate(team, "")?;
    raw.allowed.validate(team, ALLOWED_PREFIX)?;
    ratings.validate()?;

    let offense = &raw.offense;
    let allowed = &raw.allowed;

    let possessions = offense.possessions();
    if possessions <= 0.0 {
        return Err(DataError::ZeroPossessions {
            team: team.to_string(),
        });
    }
    let shares = offense.event_shares(team, possessions)?;

    let opp_possessions = allowed.possessions();
    if opp_possessions <= 0.0 {
        return Err(DataError::ZeroOpponentPossessions {
            team: team.to_string(),
        });
    }
    let allowed_shares = allowed.event_shares(team, opp_possessions)?;

    Ok(TeamProfile {
        name: team.to_string(),
        p_turnover: shares.turnover,
        p_fga: shares.fga,
        p_shooting_foul: shares.shooting_foul,
        three_par: fraction(team, "FG3A/FGA", offense.fg3a, offense.fga)?,
        two_p_pct: fraction(team, "FG2/FG2A", offense.fg2, offense.fg2a)?,
        three_p_pct: fraction(team, "FG3/FG3A", offense.fg3, offense.fg3a)?,
        ft_pct: fraction(team, "FT/FTA", offense.ft, offense.fta)?,
        orb_pct: fraction(team, "ORB/(ORB+OPP_DRB)", offense.orb, offense.orb + allowed.drb)?,
        def_efg_pct: allowed.effective_fg_pct().min(1.0),
        def_tov_pct: (allowed.tov / opp_possessions).min(1.0),
        def_orb_pct: fraction(team, "DRB", ratings.drb, 100.0)?,
        def_ftr: ratings.ftrd / 100.0,
        def_p_turnover: allowed_shares.turnover,
        def_p_fga: allowed_shares.fga,
        def_p_shooting_foul: allowed_shares.shooting_foul,
        poss_per_g: ratings.adj_t,
        adjoe: ratings.adjoe,
        adjde: ratings.adjde,
        barthag: ratings.barthag,
    })
}

/// Read-only lookup of prepared team profiles for one season.
///
/// Teams that failed to prepare keep their error so lookups can report why.
#[derive(Clone, Debug, Default)]
pub struct TeamPool {
    profiles: HashMap<String, TeamProfile>,
    rejected: HashMap<String, DataError>,
}

impl TeamPool {
    pub fn new() -> Self {
        TeamPool::default()
    }

    /// Join raw totals with ratings by team name and prepare every team.
    pub fn from_records(raw: &[RawTeamStats], ratings: &[TeamRatings]) -> Self {
        let by_name: HashMap<&str, &TeamRatings> =
            ratings.iter().map(|r| (r.team.trim(), r)).collect();

        let mut pool = TeamPool::new();
        for team_raw in raw {
            let name = team_raw.team.trim();
            let result = match by_name.get(name) {
                Some(team_ratings) => prepare(team_raw, team_ratings),
                None => Err(DataError::UnknownTeam(name.to_string())),
            };
            match result {
                Ok(profile) => pool.insert(profile),
                Err(err) => pool.reject(name, err),
            }
        }
        debug!(
            prepared = pool.profiles.len(),
            rejected = pool.rejected.len(),
            "team pool built"
        );
        pool
    }

    pub fn from_profiles<I: IntoIterator<Item = TeamProfile>>(profiles: I) -> Self {
        let mut pool = TeamPool::new();
        for profile in profiles {
            pool.insert(profile);
        }
        pool
    }

    pub fn insert(&mut self, profile: TeamProfile) {
        self.rejected.remove(&profile.name);
        self.profiles.insert(profile.name.clone(), profile);
    }

    /// Record a team whose data could not be prepared.
    pub fn reject(&mut self, name: &str, err: DataError) {
        warn!(team = name, error = %err, "excluding team with unusable data");
        self.profiles.remove(name);
        self.rejected.insert(name.to_string(), err);
    }

    pub fn get(&self, name: &str) -> Result<&TeamProfile, DataError> {
        if let Some(profile) = self.profiles.get(name) {
            return Ok(profile);
        }
        match self.rejected.get(name) {
            Some(err) => Err(err.clone()),
            None => Err(DataError::UnknownTeam(name.to_string())),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn rejected(&self) -> &HashMap<String, DataError> {
        &self.rejected
    }
}

fn team_name(record: &StatRecord) -> Result<String, DataError> {
    match record.get(TEAM_COLUMN).map(|name| name.trim()) {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(DataError::MissingField {
            team: "N/A".to_string(),
            field: TEAM_COLUMN.to_string(),
        }),
    }
}

pub(crate) fn parse_field(record: &StatRecord, team: &str, field: &str) -> Result<f64, DataError> {
    let raw = record.get(field).ok_or_else(|| DataError::MissingField {
        team: team.to_string(),
        field: field.to_string(),
    })?;
    raw.trim().parse::<f64>().map_err(|_| DataError::InvalidField {
        team: team.to_string(),
        field: field.to_string(),
        value: raw.clone(),
    })
}

fn required(record: &StatRecord, team: &str, field: &str) -> Result<f64, DataError> {
    let value = parse_field(record, team, field)?;
    check_non_negative(team, field, value)
}

fn optional(record: &StatRecord, team: &str, field: &str) -> Result<Option<f64>, DataError> {
    match record.get(field) {
        Some(raw) if !raw.trim().is_empty() => required(record, team, field).map(Some),
        _ => Ok(None),
    }
}

fn check_non_negative(team: &str, field: &str, value: f64) -> Result<f64, DataError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(DataError::OutOfRange {
            team: team.to_string(),
            field: field.to_string(),
            value,
        })
    }
}

/// `num / den` as a rate in [0, 1]; a zero denominator gives 0.
fn fraction(team: &str, field: &str, num: f64, den: f64) -> Result<f64, DataError> {
    if den <= 0.0 {
        return Ok(0.0);
    }
    let rate = num / den;
    if rate > 1.0 {
        return Err(DataError::OutOfRange {
            team: team.to_string(),
            field: field.to_string(),
            value: rate,
        });
    }
    Ok(rate)
}
