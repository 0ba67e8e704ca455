//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the engine produces identical
//! orders given identical snapshots, constants, config and seed.
//!
//! # Testing Strategy
//!
//! Sources of non-determinism the engine guards against:
//!
//! - **Floating-point math**: thresholds and weights are fixed-point
//!   ([`harvest_core::math::Ratio`]).
//!
//! - **Iteration order**: unit states live in a `BTreeMap` and clusters
//!   are sorted with an explicit tie-break, so no `HashMap` order leaks
//!   into decisions.
//!
//! - **Randomness**: destination picks use the navigator's injected RNG,
//!   seeded from the config.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use harvest_core::navigation::Navigator;
use harvest_core::snapshot::{TurnOrders, TurnSnapshot};

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps per run.
    pub steps: u64,
}

impl DeterminismResult {
    /// All unique hashes (should be 1 for a deterministic run).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert determinism, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Engine is non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a stateful process multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of independent runs
/// * `steps` - Number of steps per run
/// * `setup` - Creates the initial state
/// * `step` - Advances the state by one step
/// * `hash` - Hashes the final state
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();
        for _ in 0..steps {
            step(&mut state);
        }
        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// Feed the same snapshot sequence to a fresh navigator `runs` times and
/// compare the hash of every emitted order.
pub fn verify_navigator_determinism<F>(
    runs: usize,
    snapshots: &[TurnSnapshot],
    make_navigator: F,
) -> DeterminismResult
where
    F: Fn() -> Navigator,
{
    verify_determinism(
        runs,
        1,
        || (make_navigator(), 0u64),
        |state: &mut (Navigator, u64)| {
            state.1 = replay_hash(&mut state.0, snapshots);
        },
        |state: &(Navigator, u64)| state.1,
    )
}

/// Play `snapshots` in order and fold every turn's orders into one hash.
pub fn replay_hash(navigator: &mut Navigator, snapshots: &[TurnSnapshot]) -> u64 {
    let orders: Vec<TurnOrders> = snapshots.iter().map(|s| navigator.play_turn(s)).collect();
    compute_hash(&orders)
}

/// Compare two replays turn by turn and return the first turn index whose
/// orders differ.
pub fn find_first_divergence<F>(snapshots: &[TurnSnapshot], make_navigator: F) -> Option<usize>
where
    F: Fn() -> Navigator,
{
    let mut first = make_navigator();
    let mut second = make_navigator();
    snapshots
        .iter()
        .position(|s| first.play_turn(s) != second.play_turn(s))
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for engine inputs.
pub mod strategies {
    use harvest_core::prelude::*;
    use proptest::prelude::*;

    /// Board side length, small enough to keep cases fast.
    pub fn arb_dimension() -> impl Strategy<Value = u32> {
        3u32..24u32
    }

    /// Any position, including ones far outside the board.
    pub fn arb_position() -> impl Strategy<Value = Position> {
        (-100i32..100i32, -100i32..100i32).prop_map(|(x, y)| Position::new(x, y))
    }

    /// Any of the five directions.
    pub fn arb_direction() -> impl Strategy<Value = Direction> {
        prop::sample::select(Direction::ALL.to_vec())
    }

    /// A ranked candidate list without duplicates.
    pub fn arb_ranked_moves() -> impl Strategy<Value = Vec<Direction>> {
        Just(Direction::ALL.to_vec()).prop_shuffle().prop_flat_map(|all| {
            (1..=all.len()).prop_map(move |n| all[..n].to_vec())
        })
    }

    /// A `w x h` map with random resource in `0..=max`.
    pub fn arb_map(max: u32) -> impl Strategy<Value = GameMap> {
        (arb_dimension(), arb_dimension()).prop_flat_map(move |(w, h)| {
            proptest::collection::vec(0..=max, (w * h) as usize).prop_map(move |amounts| {
                let mut map = GameMap::new(w, h).expect("arb_dimension is positive");
                for (i, amount) in amounts.into_iter().enumerate() {
                    let x = (i as u32 % w) as i32;
                    let y = (i as u32 / w) as i32;
                    map.set_resource(Position::new(x, y), amount);
                }
                map
            })
        })
    }

    /// A map plus a set of cells marked occupied by other units.
    pub fn arb_occupied_map(max: u32) -> impl Strategy<Value = GameMap> {
        (arb_map(max), proptest::collection::vec(arb_position(), 0..12)).prop_map(
            |(mut map, blocked)| {
                for (i, pos) in blocked.into_iter().enumerate() {
                    map.mark_occupied(pos, UnitId(1000 + i as u32));
                }
                map
            },
        )
    }

    /// Match lengths short enough to hit recall quickly.
    pub fn arb_turn_count() -> impl Strategy<Value = u32> {
        1u32..60u32
    }
}
