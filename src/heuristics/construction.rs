//! Construction of complete paths from a network state.
//!
//! Both constructors share [`perform_journey`]: move as much as possible
//! (bounded by the journey capacity) from a surplus depot to a deficit depot
//! and report which endpoints reached equilibrium.

use crate::network::{DepotId, Network};
use crate::solution::{Journey, Path};
use rand::prelude::*;

pub trait ConstructionHeuristic {
    /// Build a complete path for `network`. The network is not modified.
    fn construct(&self, network: &Network, rng: &mut dyn RngCore) -> Path;
    fn name(&self) -> &str;
}

/// Move `min(s_from, |s_to|, max_journey_size)` units from `from` to `to`.
///
/// Returns the journey and the endpoints (0, 1 or 2) whose supply is now
/// exactly zero.
pub fn perform_journey(
    network: &mut Network,
    from: DepotId,
    to: DepotId,
    max_journey_size: i32,
) -> (Journey, Vec<DepotId>) {
    let quantity = network
        .supply(from)
        .min(network.supply(to).abs())
        .min(max_journey_size);

    network.move_supply(from, to, quantity);

    let mut balanced = Vec::with_capacity(2);
    if network.supply(from) == 0 {
        balanced.push(from);
    }
    if network.supply(to) == 0 {
        balanced.push(to);
    }

    (Journey::new(from, to, quantity), balanced)
}

/// Drive `network` to equilibrium with uniformly random surplus/deficit
/// pairings, mutating it in place. Returns the journeys performed.
///
/// `max_journey_size` must be positive.
pub fn complete_randomly<R: Rng + ?Sized>(network: &mut Network, max_journey_size: i32, rng: &mut R) -> Path {
    let mut surplus = network.surplus_ids();
    let mut deficit = network.deficit_ids();
    let mut path = Vec::new();

    while !surplus.is_empty() {
        let (Some(&from), Some(&to)) = (surplus.choose(rng), deficit.choose(rng)) else {
            // Only reachable when the supplies do not sum to zero
            break;
        };

        let (journey, balanced) = perform_journey(network, from, to, max_journey_size);
        path.push(journey);

        if !balanced.is_empty() {
            surplus.retain(|id| !balanced.contains(id));
            deficit.retain(|id| !balanced.contains(id));
        }
    }

    path
}

/// Uniformly random construction
#[derive(Debug, Clone)]
pub struct RandomConstruction {
    pub max_journey_size: i32,
}

impl RandomConstruction {
    pub fn new(max_journey_size: i32) -> Self {
        RandomConstruction { max_journey_size }
    }
}

impl Default for RandomConstruction {
    fn default() -> Self {
        Self::new(20)
    }
}

impl ConstructionHeuristic for RandomConstruction {
    fn construct(&self, network: &Network, rng: &mut dyn RngCore) -> Path {
        let mut probe = network.clone();
        complete_randomly(&mut probe, self.max_journey_size, rng)
    }

    fn name(&self) -> &str {
        "Random"
    }
}
