//! Fixtures shared by the unit tests.

use crate::team::{prepare, BoxTotals, RawTeamStats, StatRecord, TeamProfile, TeamRatings};

pub fn raw_stats(name: &str) -> RawTeamStats {
    RawTeamStats {
        team: name.to_string(),
        offense: BoxTotals {
            fga: 2300.0,
            fg: 1080.0,
            fg2a: 1400.0,
            fg2: 780.0,
            fg3a: 900.0,
            fg3: 300.0,
            fta: 800.0,
            ft: 600.0,
            orb: 450.0,
            drb: 1000.0,
            tov: 380.0,
        },
        allowed: BoxTotals {
            fga: 2250.0,
            fg: 900.0,
            fg2a: 1400.0,
            fg2: 640.0,
            fg3a: 850.0,
            fg3: 260.0,
            fta: 650.0,
            ft: 460.0,
            orb: 330.0,
            drb: 900.0,
            tov: 480.0,
        },
    }
}

pub fn ratings(name: &str) -> TeamRatings {
    TeamRatings {
        team: name.to_string(),
        adjoe: 128.4,
        adjde: 93.9,
        adj_t: 70.1,
        barthag: 0.9703,
        drb: 28.9,
        ftrd: 29.5,
        games: Some(37.0),
        wins: Some(33.0),
    }
}

/// The fixture team rendered as CSV-style rows.
pub fn record_for(name: &str) -> (StatRecord, StatRecord) {
    let raw = raw_stats(name);
    let mut raw_record = StatRecord::new();
    raw_record.insert("TEAM".to_string(), name.to_string());
    for (prefix, totals) in [("", &raw.offense), ("OPP_", &raw.allowed)] {
        let values = [
            ("FGA", totals.fga),
            ("FG", totals.fg),
            ("FG2A", totals.fg2a),
            ("FG2", totals.fg2),
            ("FG3A", totals.fg3a),
            ("FG3", totals.fg3),
            ("FTA", totals.fta),
            ("FT", totals.ft),
            ("ORB", totals.orb),
            ("DRB", totals.drb),
            ("TOV", totals.tov),
        ];
        for (column, value) in values {
            raw_record.insert(format!("{prefix}{column}"), value.to_string());
        }
    }

    let team_ratings = ratings(name);
    let mut ratings_record = StatRecord::new();
    ratings_record.insert("TEAM".to_string(), format!(" {name} "));
    ratings_record.insert("ADJOE".to_string(), team_ratings.adjoe.to_string());
    ratings_record.insert("ADJDE".to_string(), team_ratings.adjde.to_string());
    ratings_record.insert("ADJ_T".to_string(), team_ratings.adj_t.to_string());
    ratings_record.insert("BARTHAG".to_string(), team_ratings.barthag.to_string());
    ratings_record.insert("DRB".to_string(), team_ratings.drb.to_string());
    ratings_record.insert("FTRD".to_string(), team_ratings.ftrd.to_string());
    ratings_record.insert("G".to_string(), "37".to_string());
    ratings_record.insert("W".to_string(), "33".to_string());
    ratings_record.insert("EFG_O".to_string(), "55.1".to_string());
    ratings_record.insert("TOR".to_string(), "15.2".to_string());
    ratings_record.insert("ORB".to_string(), "36.4".to_string());
    ratings_record.insert("FTR".to_string(), "34.8".to_string());

    (raw_record, ratings_record)
}

pub fn profile(name: &str) -> TeamProfile {
    prepare(&raw_stats(name), &ratings(name)).expect("fixture team prepares")
}

/// A profile whose shooting and ratings scale with `strength` in [0, 1].
pub fn graded_profile(name: &str, strength: f64) -> TeamProfile {
    let mut team = profile(name);
    team.two_p_pct = 0.44 + 0.14 * strength;
    team.three_p_pct = 0.29 + 0.10 * strength;
    team.p_turnover = 0.16 - 0.05 * strength;
    team.p_shooting_foul = 0.11;
    team.p_fga = 1.0 - team.p_turnover - team.p_shooting_foul;
    team.def_efg_pct = 0.54 - 0.08 * strength;
    team.adjoe = 100.0 + 25.0 * strength;
    team.adjde = 108.0 - 16.0 * strength;
    team.barthag = 0.2 + 0.78 * strength;
    team
}

pub fn league() -> crate::league::LeagueBaseline {
    crate::league::LeagueBaseline {
        efg_pct: 0.505,
        tov_pct: 0.175,
        orb_pct: 0.29,
        ftr: 0.33,
        ppg: 106.4,
        team_count: 364,
    }
}

/// 64 teams where `team{i}` gets stronger with `i`, paired 0-1, 2-3, ...
pub fn field_of_64() -> (Vec<(String, String)>, crate::team::TeamPool) {
    let profiles: Vec<TeamProfile> = (0..64)
        .map(|i| graded_profile(&format!("team{}", i), i as f64 / 63.0))
        .collect();
    let bracket = profiles
        .chunks(2)
        .map(|pair| (pair[0].name.clone(), pair[1].name.clone()))
        .collect();
    (bracket, crate::team::TeamPool::from_profiles(profiles))
}

/// Default config with few games per matchup, for bracket-level tests.
pub fn quick_config() -> crate::config::SimulationConfig {
    crate::config::SimulationConfig::default().with_num_simulations(20)
}
