//! Log5 opponent adjustment of a team's event rates.
//!
//! Every adjusted rate compares the team's own rate with the opponent's
//! ability to prevent that event, `log5(rate, 1 - allowed)`, never with the
//! allowed rate directly. The shooting foul rate and eFG% follow the same
//! rule, so a defense that fouls more or allows a higher eFG% raises the
//! team's adjusted rate. Under
//! [`OpponentModel::LeagueAnchored`] the result is additionally re-centred on
//! the league rate, which turns the two-way Log5 into the full odds-ratio
//! form `odds(team) * odds(allowed) / odds(league)`.

use serde::{Deserialize, Serialize};

use crate::config::OpponentModel;
use crate::constants::{AND_ONE_SHARE, MAKE_PCT_CAP};
use crate::league::LeagueBaseline;
use crate::team::TeamProfile;

/// Head-to-head estimate from two rates of the same event.
///
/// `(a - a*b) / (a + b - 2*a*b)`. When the denominator vanishes (both inputs
/// at the same boundary) the result is the midpoint `(a + b) / 2`.
pub fn log5(a: f64, b: f64) -> f64 {
    let denominator = a + b - 2.0 * a * b;
    if denominator == 0.0 {
        return (a + b) / 2.0;
    }
    (a - a * b) / denominator
}

/// Opponent-adjusted probabilities for one team attacking one opponent.
///
/// The six event-initiation probabilities sum to 1; `p_make_2` and
/// `p_make_3` never exceed [`MAKE_PCT_CAP`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdjustedProbabilities {
    pub p_fga_2: f64,
    pub p_fga_3: f64,
    pub p_turnover: f64,
    pub p_foul_on_2: f64,
    pub p_foul_on_3: f64,
    pub p_and_one: f64,
    pub p_make_2: f64,
    pub p_make_3: f64,
    pub p_ft_make: f64,
    pub p_offensive_rebound: f64,
}

impl AdjustedProbabilities {
    /// Sum of the probabilities that start a possession's outcome.
    pub fn initiation_total(&self) -> f64 {
        self.p_fga_2
            + self.p_fga_3
            + self.p_turnover
            + self.p_foul_on_2
            + self.p_foul_on_3
            + self.p_and_one
    }

    /// Every field with its name, for validation and reporting.
    pub fn fields(&self) -> [(&'static str, f64); 10] {
        [
            ("p_fga_2", self.p_fga_2),
            ("p_fga_3", self.p_fga_3),
            ("p_turnover", self.p_turnover),
            ("p_foul_on_2", self.p_foul_on_2),
            ("p_foul_on_3", self.p_foul_on_3),
            ("p_and_one", self.p_and_one),
            ("p_make_2", self.p_make_2),
            ("p_make_3", self.p_make_3),
            ("p_ft_make", self.p_ft_make),
            ("p_offensive_rebound", self.p_offensive_rebound),
        ]
    }
}

/// Adjust `team`'s rates for a game against `opponent`.
pub fn adjust_for_opponent(
    team: &TeamProfile,
    opponent: &TeamProfile,
    league: &LeagueBaseline,
    model: OpponentModel,
) -> AdjustedProbabilities {
    let anchored = |rate: f64, allowed: f64, league_rate: f64| {
        let adjusted = against(rate, allowed);
        match model {
            OpponentModel::Prevention => adjusted,
            OpponentModel::LeagueAnchored => unit(log5(adjusted, unit(league_rate))),
        }
    };

    // Event mix
    let turnover = anchored(team.p_turnover, opponent.def_p_turnover, league.tov_pct);
    let foul = against(team.p_shooting_foul, opponent.def_p_shooting_foul);
    let fga = against(team.p_fga, opponent.def_p_fga);
    let (turnover, foul, fga) = renormalize(team, turnover, foul, fga);

    let offensive_rebound = anchored(team.orb_pct, opponent.def_orb_pct, league.orb_pct);

    // Shooting: one scaling factor from the eFG adjustment applied to both
    // two and three point percentages.
    let raw_efg = team.effective_fg_pct();
    let adjusted_efg = anchored(raw_efg, opponent.def_efg_pct, league.efg_pct);
    let scaling = if raw_efg > 0.0 {
        adjusted_efg / unit(raw_efg)
    } else {
        1.0
    };
    let p_make_2 = (team.two_p_pct * scaling).clamp(0.0, MAKE_PCT_CAP);
    let p_make_3 = (team.three_p_pct * scaling).clamp(0.0, MAKE_PCT_CAP);

    // Split by the team's own shot mix
    let three_par = unit(team.three_par);
    let p_and_one = AND_ONE_SHARE * foul;
    let plain_foul = foul - p_and_one;

    AdjustedProbabilities {
        p_fga_2: fga * (1.0 - three_par),
        p_fga_3: fga * three_par,
        p_turnover: turnover,
        p_foul_on_2: plain_foul * (1.0 - three_par),
        p_foul_on_3: plain_foul * three_par,
        p_and_one,
        p_make_2,
        p_make_3,
        p_ft_make: unit(team.ft_pct),
        p_offensive_rebound: offensive_rebound,
    }
}

/// Team rate against an opponent that allows `allowed` of the same event.
fn against(rate: f64, allowed: f64) -> f64 {
    unit(log5(unit(rate), 1.0 - unit(allowed)))
}

fn unit(rate: f64) -> f64 {
    rate.clamp(0.0, 1.0)
}

/// Rescale the three event rates to sum to 1, falling back on the team's
/// unadjusted mix if every adjusted rate collapsed to zero.
fn renormalize(team: &TeamProfile, turnover: f64, foul: f64, fga: f64) -> (f64, f64, f64) {
    let total = turnover + foul + fga;
    if total > 0.0 {
        (turnover / total, foul / total, fga / total)
    } else {
        (team.p_turnover, team.p_shooting_foul, team.p_fga)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{graded_profile, league, profile};
    use proptest::prelude::*;

    #[test]
    fn test_log5_even_matchup() {
        for a in [0.01, 0.2, 0.5, 0.77, 0.99] {
            assert_eq!(log5(a, a), 0.5);
        }
    }

    #[test]
    fn test_log5_boundaries() {
        assert_eq!(log5(0.0, 0.0), 0.0);
        assert_eq!(log5(1.0, 1.0), 1.0);
        assert_eq!(log5(0.0, 0.4), 0.0);
        assert!((log5(1.0, 0.4) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_log5_favors_stronger_side() {
        assert!(log5(0.8, 0.4) > 0.5);
        assert!(log5(0.4, 0.8) < 0.5);
        assert!((log5(0.8, 0.4) + log5(0.4, 0.8) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_neutral_opponent_leaves_rate() {
        // Allowing half of all chances is a neutral defense
        assert!((against(0.3, 0.5) - 0.3).abs() < 1e-12);
        assert!(against(0.3, 0.6) > 0.3);
        assert!(against(0.3, 0.4) < 0.3);
    }

    #[test]
    fn test_league_anchored_is_neutral_at_league_rate() {
        let league_rate = 0.29;
        let adjusted = log5(against(league_rate, league_rate), league_rate);
        assert!((adjusted - league_rate).abs() < 1e-12);
    }

    #[test]
    fn test_initiation_sums_to_one() {
        let team = profile("florida");
        let opponent = graded_profile("houston", 0.9);
        for model in [OpponentModel::Prevention, OpponentModel::LeagueAnchored] {
            let probs = adjust_for_opponent(&team, &opponent, &league(), model);
            assert!((probs.initiation_total() - 1.0).abs() < 1e-9);
            assert!(probs.p_make_2 <= MAKE_PCT_CAP);
            assert!(probs.p_make_3 <= MAKE_PCT_CAP);
        }
    }

    #[test]
    fn test_and_one_carve_out() {
        let team = profile("florida");
        let opponent = profile("auburn");
        let probs = adjust_for_opponent(&team, &opponent, &league(), OpponentModel::Prevention);

        let foul_total = probs.p_foul_on_2 + probs.p_foul_on_3 + probs.p_and_one;
        assert!((probs.p_and_one - AND_ONE_SHARE * foul_total).abs() < 1e-12);
        let split = probs.p_foul_on_3 / (probs.p_foul_on_2 + probs.p_foul_on_3);
        assert!((split - team.three_par).abs() < 1e-12);
        let fga_split = probs.p_fga_3 / (probs.p_fga_2 + probs.p_fga_3);
        assert!((fga_split - team.three_par).abs() < 1e-12);
    }

    #[test]
    fn test_better_defense_lowers_shooting() {
        let team = profile("florida");
        let soft = graded_profile("soft", 0.0);
        let stingy = graded_profile("stingy", 1.0);

        let vs_soft = adjust_for_opponent(&team, &soft, &league(), OpponentModel::Prevention);
        let vs_stingy = adjust_for_opponent(&team, &stingy, &league(), OpponentModel::Prevention);
        assert!(vs_soft.p_make_2 > vs_stingy.p_make_2);
        assert!(vs_soft.p_make_3 > vs_stingy.p_make_3);
        // The scale factor is shared, so the ratio is preserved
        let ratio_soft = vs_soft.p_make_3 / vs_soft.p_make_2;
        let ratio_stingy = vs_stingy.p_make_3 / vs_stingy.p_make_2;
        assert!((ratio_soft - ratio_stingy).abs() < 1e-12);
    }

    #[test]
    fn test_fouling_defense_raises_foul_share() {
        let team = profile("florida");
        let mut clean = profile("clean");
        clean.def_p_shooting_foul = 0.05;
        let mut hacking = profile("hacking");
        hacking.def_p_shooting_foul = 0.30;

        let foul_share = |opponent: &TeamProfile| {
            let probs = adjust_for_opponent(&team, opponent, &league(), OpponentModel::Prevention);
            probs.p_foul_on_2 + probs.p_foul_on_3 + probs.p_and_one
        };
        assert!(foul_share(&hacking) > foul_share(&clean));
    }

    #[test]
    fn test_make_cap() {
        let mut team = profile("florida");
        team.two_p_pct = 0.99;
        team.three_p_pct = 0.98;
        let mut opponent = profile("sieve");
        opponent.def_efg_pct = 0.95;

        let probs = adjust_for_opponent(&team, &opponent, &league(), OpponentModel::Prevention);
        assert_eq!(probs.p_make_2, MAKE_PCT_CAP);
        assert_eq!(probs.p_make_3, MAKE_PCT_CAP);
    }

    #[test]
    fn test_no_offensive_rebounds() {
        let mut team = profile("florida");
        team.orb_pct = 0.0;
        let opponent = profile("auburn");
        for model in [OpponentModel::Prevention, OpponentModel::LeagueAnchored] {
            let probs = adjust_for_opponent(&team, &opponent, &league(), model);
            assert_eq!(probs.p_offensive_rebound, 0.0);
        }
    }

    #[test]
    fn test_free_throws_not_adjusted() {
        let team = profile("florida");
        let probs = adjust_for_opponent(
            &team,
            &graded_profile("x", 0.3),
            &league(),
            OpponentModel::Prevention,
        );
        assert_eq!(probs.p_ft_make, team.ft_pct);
    }

    proptest! {
        #[test]
        fn prop_log5_symmetry(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
            let p = log5(a, b);
            prop_assert!((-1e-12..=1.0 + 1e-12).contains(&p));
            let q = log5(b, a);
            if a + b - 2.0 * a * b != 0.0 {
                prop_assert!((p + q - 1.0).abs() < 1e-9);
            }
        }

        #[test]
        fn prop_adjusted_initiation_sums_to_one(
            strength_a in 0.0f64..=1.0,
            strength_b in 0.0f64..=1.0,
            three_par in 0.0f64..=1.0,
            orb in 0.0f64..=1.0,
        ) {
            let mut team = graded_profile("a", strength_a);
            team.three_par = three_par;
            team.orb_pct = orb;
            let opponent = graded_profile("b", strength_b);
            let probs = adjust_for_opponent(&team, &opponent, &league(), OpponentModel::Prevention);

            prop_assert!((probs.initiation_total() - 1.0).abs() < 1e-9);
            prop_assert!(probs.p_make_2 <= MAKE_PCT_CAP && probs.p_make_3 <= MAKE_PCT_CAP);
            for (_, value) in probs.fields() {
                prop_assert!((0.0..=1.0).contains(&value));
            }
        }
    }
}
