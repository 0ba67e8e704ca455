//! Property tests for the grid, resolver, cluster ranking and recall.

use std::collections::BTreeSet;

use harvest_core::cluster::rank_clusters;
use harvest_core::prelude::*;
use harvest_core::resolver::choose_safe_move;
use harvest_test_utils::determinism::strategies::{
    arb_direction, arb_map, arb_occupied_map, arb_position, arb_ranked_moves, arb_turn_count,
};
use harvest_test_utils::fixtures::{constants, patterned_map, snapshot, unit};
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_distance_is_symmetric(map in arb_map(0), a in arb_position(), b in arb_position()) {
        prop_assert_eq!(map.distance(a, b), map.distance(b, a));
        prop_assert_eq!(map.distance(a, a), 0);
        prop_assert_eq!(map.distance(a, b), map.distance(map.normalize(a), map.normalize(b)));
    }

    #[test]
    fn prop_target_directions_shorten_the_trip(map in arb_map(0), a in arb_position(), b in arb_position()) {
        let before = map.distance(a, b);
        let directions = map.target_directions(a, b);
        prop_assert_eq!(directions.is_empty(), before == 0);
        for direction in directions {
            prop_assert_eq!(map.distance(a.offset(direction), b), before - 1);
        }
    }

    #[test]
    fn prop_single_step_is_one_away_and_undone_by_inverse(
        map in arb_map(0),
        from in arb_position(),
        direction in arb_direction(),
    ) {
        let to = from.offset(direction);
        let expected = u32::from(direction.is_move());
        prop_assert_eq!(map.distance(from, to), expected);
        prop_assert_eq!(map.normalize(to.offset(direction.invert())), map.normalize(from));
    }

    #[test]
    fn prop_safe_move_takes_first_free_candidate(
        mut map in arb_occupied_map(0),
        from in arb_position(),
        ranked in arb_ranked_moves(),
    ) {
        let me = UnitId(1);
        map.mark_occupied(from, me);
        let expected = ranked
            .iter()
            .copied()
            .find(|&d| map.is_free_for(from.offset(d), me))
            .unwrap_or(Direction::Still);

        let chosen = choose_safe_move(&mut map, me, from, &ranked);
        prop_assert_eq!(chosen, expected);
        prop_assert_eq!(map.cell(from.offset(chosen)).occupant, Some(me));
    }

    #[test]
    fn prop_cluster_ranking_is_stable(map in arb_map(1000), yard in arb_position()) {
        let config = EngineConfig::default();
        let first = rank_clusters(&map, yard, &config);
        let second = rank_clusters(&map, yard, &config);
        prop_assert!(first.len() <= config.cluster_top_n);
        prop_assert!(first.windows(2).all(|w| w[0].total() >= w[1].total()));
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_endgame_never_reverts(max_turns in arb_turn_count(), seed in any::<u64>()) {
        let map = patterned_map(12, 1000);
        let home = Position::new(6, 6);
        let consts = GameConstants { max_turns, ..constants(12) };
        let mut nav = Navigator::new(consts, EngineConfig::default().with_seed(seed));

        let mut seen_endgame = false;
        for turn in 1..=max_turns {
            // Units drift around so recall distance changes from turn to turn.
            let offset = (turn % 6) as i32;
            let units = vec![unit(1, offset, 0, 0), unit(2, 6, 6 + offset, 100)];
            nav.play_turn(&snapshot(turn, &map, units, home, 0));
            if seen_endgame {
                prop_assert_eq!(nav.game_mode(), GameMode::Endgame);
            }
            seen_endgame |= nav.game_mode() == GameMode::Endgame;
        }
        prop_assert!(seen_endgame);
    }

    #[test]
    fn prop_no_two_units_share_a_target(
        map in arb_map(1000),
        cells in proptest::collection::btree_set((0i32..3, 0i32..3), 1..9),
        seed in any::<u64>(),
    ) {
        let home = Position::new(0, 0);
        let units: Vec<Unit> = cells
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| unit(i as u32 + 1, x, y, (i as u32 * 137) % 1000))
            .collect();
        let consts = GameConstants {
            width: map.width(),
            height: map.height(),
            ..GameConstants::default()
        };
        let mut nav = Navigator::new(consts, EngineConfig::default().with_seed(seed));
        let orders = nav.play_turn(&snapshot(1, &map, units.clone(), home, 0));

        prop_assert_eq!(nav.game_mode(), GameMode::Normal);
        prop_assert_eq!(orders.moves.len(), units.len());
        let mut targets = BTreeSet::new();
        for (command, u) in orders.moves.iter().zip(&units) {
            prop_assert_eq!(command.unit, u.id);
            let target = map.normalize(u.position.offset(command.direction));
            prop_assert!(targets.insert(target), "two units ordered onto {}", target);
        }
    }
}
