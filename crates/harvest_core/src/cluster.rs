//! Resource discovery through 3x3 clusters.
//!
//! The board is sampled on a fixed stride; each sample becomes the center of
//! a 3x3 cluster whose score is the sum of its cells' resource, boosted when
//! the cluster sits close to the shipyard. The best few clusters are
//! published as destinations for collecting units.
//!
//! Recomputation is wholesale: a refresh throws the previous ranking away.
//! Clusters carry no identity from one refresh to the next.

use std::cmp::Reverse;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{DestinationPolicy, EngineConfig};
use crate::grid::{GameMap, Position};

/// A 3x3 neighbourhood scored as one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// Sampled center cell.
    center: Position,
    /// Member cells, center first. Normally 9.
    members: Vec<Position>,
    /// Proximity multiplier applied to the raw sum.
    multiplier: u32,
    /// Raw resource sum x multiplier.
    total: u64,
}

impl Cluster {
    /// Build the cluster centered on `center`.
    ///
    /// Neighbours that cannot be looked up are skipped; the cluster stays
    /// usable with fewer members.
    #[must_use]
    pub fn build(map: &GameMap, center: Position, shipyard: Position, proximity: u32) -> Self {
        let center = map.normalize(center);
        let mut members = Vec::with_capacity(9);
        let mut raw: u64 = 0;

        members.push(center);
        raw += u64::from(map.resource(center));

        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                match map.cell_at_offset(center, dx, dy) {
                    Ok((pos, cell)) => {
                        members.push(pos);
                        raw += u64::from(cell.resource);
                    }
                    Err(err) => warn!(%err, "Skipping cluster neighbour"),
                }
            }
        }

        // Straight-line distance below width / 3, kept in integers:
        // d < w / 3  <=>  9 d^2 < w^2.
        let width = u64::from(map.width());
        let near_home = 9 * map.euclidean_distance_squared(center, shipyard) < width * width;
        let multiplier = if near_home { proximity.max(1) } else { 1 };

        Self {
            center,
            members,
            multiplier,
            total: raw * u64::from(multiplier),
        }
    }

    /// Sampled center cell.
    #[must_use]
    pub const fn center(&self) -> Position {
        self.center
    }

    /// Member cells, center first.
    #[must_use]
    pub fn members(&self) -> &[Position] {
        &self.members
    }

    /// Proximity multiplier in effect (1 when far from home).
    #[must_use]
    pub const fn multiplier(&self) -> u32 {
        self.multiplier
    }

    /// Multiplied resource total.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Returns true if `pos` is one of the member cells.
    #[must_use]
    pub fn contains(&self, map: &GameMap, pos: Position) -> bool {
        let pos = map.normalize(pos);
        self.members.contains(&pos)
    }

    /// The richest member cell on the current map. Ties go to the earlier
    /// member, so the center wins when everything is equal.
    #[must_use]
    pub fn rich_position(&self, map: &GameMap) -> Position {
        let mut best = self.center;
        let mut best_amount = map.resource(self.center);
        for &pos in &self.members[1..] {
            let amount = map.resource(pos);
            if amount > best_amount {
                best = pos;
                best_amount = amount;
            }
        }
        best
    }
}

/// The published cluster ranking and its refresh bookkeeping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterIndex {
    ranked: Vec<Cluster>,
    last_refresh: Option<u32>,
}

impl ClusterIndex {
    /// An empty index; the first [`is_due`](Self::is_due) check is true.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Published clusters, best first.
    #[must_use]
    pub fn ranked(&self) -> &[Cluster] {
        &self.ranked
    }

    /// Turn of the last refresh.
    #[must_use]
    pub const fn last_refresh(&self) -> Option<u32> {
        self.last_refresh
    }

    /// Returns true when the schedule says to recompute, or when nothing is
    /// published.
    #[must_use]
    pub fn is_due(&self, turn: u32, interval: u32) -> bool {
        self.ranked.is_empty()
            || self
                .last_refresh
                .map_or(true, |last| turn.saturating_sub(last) >= interval)
    }

    /// Recompute and replace the published ranking.
    pub fn refresh(&mut self, map: &GameMap, shipyard: Position, config: &EngineConfig, turn: u32) {
        self.ranked = rank_clusters(map, shipyard, config);
        self.last_refresh = Some(turn);
        match self.ranked.first() {
            Some(best) => info!(
                turn,
                published = self.ranked.len(),
                best_total = best.total(),
                "Cluster ranking refreshed"
            ),
            // Retried every turn while empty.
            None => debug!(turn, "No resource clusters to publish"),
        }
    }

    /// Pick a destination cell for a unit at `from`.
    ///
    /// Returns `None` when no cluster is published.
    pub fn select_destination<R: Rng + ?Sized>(
        &self,
        map: &GameMap,
        from: Position,
        policy: DestinationPolicy,
        rng: &mut R,
    ) -> Option<Position> {
        let cluster = match policy {
            DestinationPolicy::Random => self.ranked.choose(rng)?,
            DestinationPolicy::Nearest => self
                .ranked
                .iter()
                .enumerate()
                .min_by_key(|(rank, c)| (map.distance(from, c.center), *rank))
                .map(|(_, c)| c)?,
        };
        Some(cluster.rich_position(map))
    }
}

/// Sample, score and rank clusters, keeping the top `cluster_top_n` with a
/// non-zero total.
///
/// The result only depends on the map contents, never on iteration order:
/// ties are broken by center row, then column.
#[must_use]
pub fn rank_clusters(map: &GameMap, shipyard: Position, config: &EngineConfig) -> Vec<Cluster> {
    let stride = config.cluster_stride.max(1) as usize;
    let anchor = (stride / 2) as u32;

    let mut clusters: Vec<Cluster> = Vec::new();
    for y in (0..map.height()).step_by(stride) {
        for x in (0..map.width()).step_by(stride) {
            let center = Position::new(
                ((x + anchor) % map.width()) as i32,
                ((y + anchor) % map.height()) as i32,
            );
            let cluster = Cluster::build(map, center, shipyard, config.proximity_multiplier);
            if cluster.total > 0 {
                clusters.push(cluster);
            }
        }
    }

    clusters.sort_by_key(|c| (Reverse(c.total), c.center.y, c.center.x));
    clusters.truncate(config.cluster_top_n);
    clusters
}
