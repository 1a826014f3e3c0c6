//! Route sequencer: shortest open path through a day's stops.
//!
//! Nearest-neighbour construction followed by 2-opt improvement. Day
//! itineraries are small (a handful to a few dozen stops), so every
//! candidate move is re-costed over the whole path; this keeps the
//! search correct for asymmetric durations.

use tracing::{debug, warn};

use crate::matrix::DistanceMatrix;
use crate::model::{Anchors, Stop, StopId};

#[derive(Debug, Clone)]
pub struct SequenceOptions {
    /// Maximum improving 2-opt moves applied per starting order.
    pub max_iterations: usize,
}

impl Default for SequenceOptions {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sequence {
    /// Visiting order, anchors included at their fixed ends.
    pub order: Vec<Stop>,
    /// Total travel seconds along `order` (`u64::MAX` if a leg is missing).
    pub cost: u64,
    /// Consecutive pairs in `order` that have no leg in the matrix.
    pub missing_legs: Vec<(StopId, StopId)>,
}

impl Sequence {
    pub fn ids(&self) -> Vec<&StopId> {
        self.order.iter().map(|stop| &stop.id).collect()
    }
}

/// Orders `stops` to minimise total travel duration.
///
/// The start anchor (if any) stays first and the end anchor stays last;
/// everything between them may be permuted. Equal-cost alternatives are
/// resolved by stop id and scan order, so identical input always yields
/// the identical order. The result is never costlier than visiting the
/// stops in the order given.
pub fn sequence(
    stops: &[Stop],
    matrix: &DistanceMatrix,
    anchors: &Anchors,
    options: &SequenceOptions,
) -> Sequence {
    let nodes: Vec<&Stop> = anchors
        .start
        .iter()
        .chain(stops.iter())
        .chain(anchors.end.iter())
        .collect();
    let ids: Vec<&StopId> = nodes.iter().map(|stop| &stop.id).collect();

    let first_movable = usize::from(anchors.start.is_some());
    let movable: Vec<usize> = (first_movable..first_movable + stops.len()).collect();

    let given: Vec<usize> = (0..nodes.len()).collect();
    let order = if stops.len() <= 1 {
        given
    } else {
        let cost_of = |path: &[usize]| path_cost(path, &ids, matrix);
        let (lo, hi) = (first_movable, first_movable + stops.len() - 1);

        let mut greedy = nearest_neighbor(&movable, anchors, &ids, matrix);
        let greedy_moves = two_opt(&mut greedy, lo, hi, &cost_of, options.max_iterations);

        let mut baseline = given;
        let baseline_moves = two_opt(&mut baseline, lo, hi, &cost_of, options.max_iterations);

        let (greedy_cost, baseline_cost) = (cost_of(&greedy), cost_of(&baseline));
        debug!(
            greedy_cost,
            greedy_moves, baseline_cost, baseline_moves, "sequenced day route"
        );
        if baseline_cost < greedy_cost { baseline } else { greedy }
    };

    let mut missing_legs = Vec::new();
    for pair in order.windows(2) {
        let (from, to) = (ids[pair[0]], ids[pair[1]]);
        if matrix.get(from, to).is_none() {
            warn!(%from, %to, "no leg in distance matrix for consecutive stops");
            missing_legs.push((from.clone(), to.clone()));
        }
    }

    Sequence {
        cost: path_cost(&order, &ids, matrix),
        order: order.iter().map(|&index| nodes[index].clone()).collect(),
        missing_legs,
    }
}

fn path_cost(path: &[usize], ids: &[&StopId], matrix: &DistanceMatrix) -> u64 {
    path.windows(2).fold(0u64, |total, pair| {
        match matrix.get(ids[pair[0]], ids[pair[1]]) {
            Some(leg) => total.saturating_add(u64::from(leg.duration_seconds)),
            None => u64::MAX,
        }
    })
}

/// `(duration, distance)` of a leg; missing legs sort last.
fn leg_key(from: &StopId, to: &StopId, matrix: &DistanceMatrix) -> (u64, u64) {
    matrix
        .get(from, to)
        .map(|leg| (u64::from(leg.duration_seconds), u64::from(leg.distance_meters)))
        .unwrap_or((u64::MAX, u64::MAX))
}

/// Greedy construction from the start anchor, or from the median stop
/// when the start is free.
fn nearest_neighbor(
    movable: &[usize],
    anchors: &Anchors,
    ids: &[&StopId],
    matrix: &DistanceMatrix,
) -> Vec<usize> {
    let mut remaining = movable.to_vec();
    let mut path = Vec::with_capacity(ids.len());

    if anchors.start.is_some() {
        path.push(0);
    } else {
        let first = median_stop(movable, ids, matrix);
        remaining.retain(|&index| index != first);
        path.push(first);
    }

    while !remaining.is_empty() {
        let current = path[path.len() - 1];
        let Some(position) = remaining
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                let (a, b) = (**a, **b);
                leg_key(ids[current], ids[a], matrix)
                    .cmp(&leg_key(ids[current], ids[b], matrix))
                    .then_with(|| ids[a].cmp(ids[b]))
            })
            .map(|(position, _)| position)
        else {
            break;
        };
        path.push(remaining.remove(position));
    }

    if anchors.end.is_some() {
        path.push(ids.len() - 1);
    }
    path
}

/// The stop whose summed distance to all other stops is the median,
/// ties broken by id.
fn median_stop(movable: &[usize], ids: &[&StopId], matrix: &DistanceMatrix) -> usize {
    let mut totals: Vec<(u64, &StopId, usize)> = movable
        .iter()
        .map(|&index| {
            let total = movable
                .iter()
                .filter(|&&other| other != index)
                .fold(0u64, |sum, &other| {
                    sum.saturating_add(leg_key(ids[index], ids[other], matrix).1)
                });
            (total, ids[index], index)
        })
        .collect();
    totals.sort();
    totals[(totals.len() - 1) / 2].2
}

/// Best-improvement 2-opt restricted to positions `lo..=hi`.
///
/// Each pass applies the single reversal with the largest saving.
/// Reversals are scanned by segment start, then segment end, and an equal
/// saving found later never displaces an earlier one. Ties therefore go to
/// the lowest positions rather than to stop ids; positions come from a
/// deterministic construction, so repeated runs still agree. Returns the
/// number of moves applied.
fn two_opt<F>(path: &mut [usize], lo: usize, hi: usize, cost_of: &F, max_iterations: usize) -> usize
where
    F: Fn(&[usize]) -> u64,
{
    if hi <= lo {
        return 0;
    }

    let mut moves = 0;
    let mut current = cost_of(path);
    while moves < max_iterations {
        let mut best: Option<(u64, usize, usize)> = None;

        for i in lo..hi {
            for j in i + 1..=hi {
                path[i..=j].reverse();
                let cost = cost_of(path);
                path[i..=j].reverse();

                let bar = best.map_or(current, |(best_cost, _, _)| best_cost);
                if cost < bar {
                    best = Some((cost, i, j));
                }
            }
        }

        let Some((cost, i, j)) = best else {
            break;
        };
        path[i..=j].reverse();
        current = cost;
        moves += 1;
    }

    moves
}
