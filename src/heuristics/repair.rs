//! Feasibility repair for recombined paths.
//!
//! Recombination can leave a surplus depot shipping too much
//! (over-resolved, now in deficit) while another ships too little
//! (under-resolved, still in surplus). [`fix`] moves the difference:
//!
//! - macro fixing re-sources journeys of over-resolved depots from
//!   under-resolved ones, splitting a journey when only part of it fits;
//! - micro fixing shifts quantity between two journeys into the same
//!   target, from the over-resolved source to an under-resolved one.
//!
//! Repair is best effort. The returned [`RepairReport`] says whether the
//! network is fully balanced afterwards.

use crate::network::{DepotId, Network};
use crate::solution::{apply, Journey, Path};
use rand::seq::SliceRandom;
use rand::Rng;

/// Outcome of one call to [`fix`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RepairReport {
    /// True if the repaired path balances the network
    pub resolved: bool,
    /// Quantity transfers performed by macro fixing
    pub macro_moves: usize,
    /// Quantity transfers performed by micro fixing
    pub micro_moves: usize,
}

impl RepairReport {
    /// True if the path was modified
    pub fn changed(&self) -> bool {
        self.macro_moves + self.micro_moves > 0
    }
}

/// Split the originally-surplus depots of `original` by their state in
/// `probe`: `(over_resolved, under_resolved)`.
pub fn surplus_imbalance(original: &Network, probe: &Network) -> (Vec<DepotId>, Vec<DepotId>) {
    let mut over = Vec::new();
    let mut under = Vec::new();
    for depot in original.depots().iter().filter(|d| d.is_surplus()) {
        match probe.supply(depot.id) {
            s if s < 0 => over.push(depot.id),
            s if s > 0 => under.push(depot.id),
            _ => {}
        }
    }
    (over, under)
}

/// Indices of the journeys leaving `source`
fn outgoing(path: &[Journey], source: DepotId) -> Vec<usize> {
    path.iter()
        .enumerate()
        .filter(|(_, j)| j.from == source)
        .map(|(idx, _)| idx)
        .collect()
}

/// Re-source the journeys of each over-resolved depot from under-resolved
/// depots. `probe` holds the state reached by applying `path` and is kept in
/// sync. Returns the number of transfers.
pub fn macro_fix<R: Rng + ?Sized>(
    path: &mut Path,
    probe: &mut Network,
    over: &[DepotId],
    under: &[DepotId],
    rng: &mut R,
) -> usize {
    let mut moves = 0;
    let mut under = under.to_vec();

    for &o in over {
        let mut journeys = outgoing(path, o);
        journeys.shuffle(rng);

        for idx in journeys {
            if probe.supply(o) >= 0 {
                break;
            }

            under.shuffle(rng);
            for &u in &under {
                let excess = -probe.supply(o);
                let available = probe.supply(u);
                let remaining = path[idx].quantity;
                if excess <= 0 || remaining <= 0 {
                    break;
                }
                if available <= 0 {
                    continue;
                }

                let amount = remaining.min(available).min(excess);
                probe.move_supply(u, o, amount);
                moves += 1;

                if amount == remaining {
                    path[idx].from = u;
                    break;
                }
                let target = path[idx].to;
                path[idx].quantity -= amount;
                path.push(Journey::new(u, target, amount));
            }

            under.retain(|&u| probe.supply(u) > 0);
        }
    }

    moves
}

/// For each over-resolved depot's journey into some target, grow a journey
/// into the same target from an under-resolved depot (up to
/// `max_journey_size`) and shrink the over-resolved journey by the same
/// amount. Journeys left empty are removed. Returns the number of transfers.
pub fn micro_fix(path: &mut Path, probe: &mut Network, over: &[DepotId], under: &[DepotId], max_journey_size: i32) -> usize {
    let mut moves = 0;

    for &o in over {
        for idx in outgoing(path, o) {
            let excess = -probe.supply(o);
            if excess <= 0 {
                break;
            }
            let target = path[idx].to;

            for other in 0..path.len() {
                let shipped = path[idx].quantity;
                let excess = -probe.supply(o);
                if shipped <= 0 || excess <= 0 {
                    break;
                }

                let candidate = path[other];
                if other == idx || candidate.to != target || !under.contains(&candidate.from) {
                    continue;
                }

                let available = probe.supply(candidate.from);
                let room = max_journey_size - candidate.quantity;
                let amount = shipped.min(excess).min(available).min(room);
                if amount <= 0 {
                    continue;
                }

                path[other].quantity += amount;
                path[idx].quantity -= amount;
                probe.move_supply(candidate.from, o, amount);
                moves += 1;
            }
        }
    }

    path.retain(|j| j.quantity != 0);
    moves
}

/// Repair `path` against `network` in place.
///
/// A path that already balances the network is left untouched.
pub fn fix<R: Rng + ?Sized>(path: &mut Path, network: &Network, max_journey_size: i32, rng: &mut R) -> RepairReport {
    let mut probe = network.clone();
    apply(path, &mut probe);

    let mut report = RepairReport::default();
    if probe.is_resolved() {
        report.resolved = true;
        return report;
    }

    let (over, under) = surplus_imbalance(network, &probe);
    if !over.is_empty() && !under.is_empty() {
        report.macro_moves = macro_fix(path, &mut probe, &over, &under, rng);
    }

    if !probe.is_resolved() {
        let (over, under) = surplus_imbalance(network, &probe);
        if !over.is_empty() && !under.is_empty() {
            report.micro_moves = micro_fix(path, &mut probe, &over, &under, max_journey_size);
        }
    }

    report.resolved = probe.is_resolved();
    if !report.resolved {
        log::warn!(
            "Repair left {} depot(s) unbalanced after {} macro and {} micro moves",
            probe.depots().iter().filter(|d| !d.is_balanced()).count(),
            report.macro_moves,
            report.micro_moves
        );
    }

    report
}
