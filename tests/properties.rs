//! Schedule-level properties across the whole pipeline.

use proptest::prelude::*;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use u_matchplan::balance::{BalanceConfig, ZoneBalancer};
use u_matchplan::coalesce::{CoalesceConfig, RoundCoalescer};
use u_matchplan::format::{emit, parse, parse_labels};
use u_matchplan::proto::ProtoRoundBuilder;
use u_matchplan::random::create_rng;
use u_matchplan::schedule::{appearance_counts, team_set, Params, Schedule};
use u_matchplan::validate::{Pipeline, ValidatorConfig};
use u_matchplan::ScheduleError;

fn assert_spacing(schedule: &Schedule, spacing: usize) {
    let matches = schedule.matches();
    for i in 0..matches.len() {
        for j in i + 1..(i + spacing + 1).min(matches.len()) {
            assert!(
                matches[i].iter().all(|t| !matches[j].contains(t)),
                "matches {i} and {j} share a team: {:?} {:?}",
                matches[i],
                matches[j]
            );
        }
    }
}

fn assert_no_reruns(schedule: &Schedule) {
    let mut seen = HashSet::new();
    for m in schedule.matches() {
        assert!(seen.insert(team_set(m)), "rerun of {m:?}");
    }
}

#[test]
fn scenario_single_round_of_four() {
    let proto = ProtoRoundBuilder::new().build(&Params::new(4, 1, 2, 1)).unwrap();
    assert_eq!(proto.num_matches(), 2);
    let teams: Vec<_> = proto.matches().iter().flatten().copied().collect();
    let unique: HashSet<_> = teams.iter().collect();
    assert_eq!(teams.len(), 4);
    assert_eq!(unique.len(), 4);
}

#[test]
fn scenario_second_round_avoids_first_round_pairs() {
    let proto = ProtoRoundBuilder::new().build(&Params::new(4, 1, 2, 0)).unwrap();
    for seed in 0..10 {
        let schedule = RoundCoalescer::new(CoalesceConfig::default().with_seed(seed))
            .coalesce(&proto, 2, 0)
            .unwrap();
        let first: HashSet<_> = schedule.matches()[..2].iter().map(|m| team_set(m)).collect();
        for m in &schedule.matches()[2..] {
            assert!(!first.contains(&team_set(m)));
        }
    }
}

#[test]
fn scenario_short_team_is_named() {
    let text = "1|2|3\n1|4|5\n1|6|7\n2|4|6\n2|5|7\n3|4|7\n3|5|6\n1|2|4\n3|6|7";
    let report = Pipeline::standard(&ValidatorConfig::default().with_spacing(0))
        .run(&parse_labels(text, "|"));
    let unequal: Vec<_> = report.with_code("unequal-appearances").collect();
    assert_eq!(unequal.len(), 1);
    assert!(unequal[0].message.contains("Team 5"));
}

#[test]
fn scenario_rerun_names_both_matches() {
    let report = Pipeline::standard(&ValidatorConfig::default().with_spacing(0))
        .run(&parse_labels("1|2|3\n1|2|3", "|"));
    let reruns: Vec<_> = report.with_code("rerun").collect();
    assert_eq!(reruns.len(), 1);
    assert_eq!(reruns[0].message, "Match 1 has the same teams as match 0 (1, 2, 3)");
}

#[test]
fn text_format_round_trips_generated_schedule() {
    let proto = ProtoRoundBuilder::new().build(&Params::new(12, 1, 4, 1)).unwrap();
    let schedule = RoundCoalescer::new(CoalesceConfig::default().with_seed(8))
        .coalesce(&proto, 3, 1)
        .unwrap();
    assert_eq!(parse(&emit(&schedule, "|"), "|").unwrap(), schedule);
}

#[test]
fn balanced_schedule_is_left_alone() {
    let schedule = parse("1|2\n3|4\n2|1\n4|3", "|").unwrap();
    let result = ZoneBalancer::run(&schedule, &BalanceConfig::default().with_seed(1)).unwrap();
    assert_eq!(result.schedule, schedule);
    assert!(result.modified.is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Every pseudo-team appears A times and matches are ascending.
    #[test]
    fn prop_proto_round_shape(
        (teams, zones) in prop_oneof![
            Just((4usize, 2usize)),
            Just((6, 2)),
            Just((6, 3)),
            Just((8, 4)),
            Just((9, 3)),
            Just((12, 4)),
        ],
        spacing in 0usize..2,
    ) {
        let params = Params::new(teams, 1, zones, spacing);
        let proto = ProtoRoundBuilder::new().build(&params).unwrap();
        for m in proto.matches() {
            prop_assert!(m.windows(2).all(|w| w[0] < w[1]));
        }
        let counts = appearance_counts(teams, proto.matches());
        prop_assert!(counts.iter().all(|&c| c == 1));
    }

    /// Spacing, no reruns and equal appearances hold across rounds.
    #[test]
    fn prop_coalesced_schedule_invariants(
        zones in prop_oneof![Just(2usize), Just(3), Just(4)],
        spacing in 0usize..2,
        rounds in 1usize..4,
        seed in any::<u64>(),
    ) {
        let params = Params::new(12, 1, zones, spacing);
        let proto = ProtoRoundBuilder::new().build(&params).unwrap();
        let coalescer = RoundCoalescer::new(CoalesceConfig::default().with_seed(seed));
        match coalescer.coalesce(&proto, rounds, spacing) {
            Ok(schedule) => {
                prop_assert_eq!(schedule.len(), rounds * params.num_matches());
                assert_spacing(&schedule, spacing);
                assert_no_reruns(&schedule);
                let counts = appearance_counts(12, schedule.matches());
                prop_assert!(counts.iter().all(|&c| c == rounds));
            }
            Err(err) => prop_assert!(
                matches!(err, ScheduleError::InfeasibleRound { .. }),
                "unexpected error: {}",
                err
            ),
        }
    }

    /// Balancing keeps every match's team set and never gets worse.
    #[test]
    fn prop_balancer_preserves_membership(seed in any::<u64>(), parallel in any::<bool>()) {
        let proto = ProtoRoundBuilder::new().build(&Params::new(8, 1, 4, 0)).unwrap();
        let schedule = RoundCoalescer::new(CoalesceConfig::default().with_seed(seed))
            .coalesce(&proto, 3, 0)
            .unwrap();

        // Scramble zone orders so there is something to fix.
        let mut rng = create_rng(seed);
        let scrambled = Schedule::new(
            schedule
                .matches()
                .iter()
                .map(|m| {
                    let mut m = m.clone();
                    m.shuffle(&mut rng);
                    m
                })
                .collect(),
        );

        let config = BalanceConfig::default()
            .with_max_passes(20)
            .with_parallel(parallel)
            .with_seed(seed);
        let result = ZoneBalancer::run(&scrambled, &config).unwrap();

        for (before, after) in scrambled.matches().iter().zip(result.schedule.matches()) {
            prop_assert_eq!(team_set(before), team_set(after));
        }
        prop_assert!(result.badness <= result.initial_badness);
        prop_assert!(result.history.windows(2).all(|w| w[1] <= w[0]));
    }
}
