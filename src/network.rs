//! Module for representing, generating and persisting TNRP networks.
//!
//! A network is a complete graph of depots. Each depot holds a signed supply
//! (positive = surplus, negative = deficit) and the supplies of a network
//! always sum to zero. Depot identities are the contiguous range `0..n`, so
//! depot `i` is stored at index `i`.
//!
//! Supplies are mutable: journeys are applied to a network in place. The
//! distance table is computed once and shared between clones, so cloning a
//! network is a cheap deep copy of its supply state. Any algorithm probing a
//! hypothetical state must work on its own clone.

use crate::error::{NetworkError, SearchError};
use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

/// Identity of a depot, equal to its index in the network.
pub type DepotId = usize;

/// Square table of pairwise distances indexed by depot identity.
pub type DistanceMatrix = Vec<Vec<f64>>;

/// A 2-D position of a depot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
}

impl Location {
    pub fn new(x: f64, y: f64) -> Self {
        Location { x, y }
    }
}

/// Distance metric used to populate the distance table
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum Metric {
    #[default]
    Euclidean,
    Manhattan,
}

impl Metric {
    /// Distance between two locations under this metric.
    pub fn distance(&self, a: &Location, b: &Location) -> f64 {
        let dx = a.x - b.x;
        let dy = a.y - b.y;
        match self {
            Metric::Euclidean => (dx * dx + dy * dy).sqrt(),
            Metric::Manhattan => dx.abs() + dy.abs(),
        }
    }
}

/// A site holding a signed supply value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Depot {
    /// Depot identifier (index in the network)
    pub id: DepotId,
    /// Position used to compute distances
    pub location: Location,
    /// Supply: positive = surplus, negative = deficit, 0 = balanced
    pub supply: i32,
}

impl Depot {
    pub fn new(id: DepotId, location: Location, supply: i32) -> Self {
        Depot { id, location, supply }
    }

    pub fn is_surplus(&self) -> bool {
        self.supply > 0
    }

    pub fn is_deficit(&self) -> bool {
        self.supply < 0
    }

    pub fn is_balanced(&self) -> bool {
        self.supply == 0
    }
}

impl fmt::Display for Depot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Depot: {}, (x,y): ({},{}), S: {}",
            self.id, self.location.x, self.location.y, self.supply
        )
    }
}

/// A complete graph of depots whose supplies sum to zero
#[derive(Debug, Clone)]
pub struct Network {
    depots: Vec<Depot>,
    distances: Arc<DistanceMatrix>,
    metric: Metric,
}

impl Network {
    /// Build a network from `(location, supply)` pairs. Depot `i` receives
    /// identity `i`.
    pub fn new(sites: Vec<(Location, i32)>, metric: Metric) -> Result<Self, NetworkError> {
        if sites.is_empty() {
            return Err(NetworkError::Empty);
        }

        let sum: i64 = sites.iter().map(|&(_, s)| s as i64).sum();
        if sum != 0 {
            return Err(NetworkError::UnbalancedSupply(sum));
        }

        let depots: Vec<Depot> = sites
            .into_iter()
            .enumerate()
            .map(|(id, (location, supply))| Depot::new(id, location, supply))
            .collect();
        let distances = Arc::new(Self::compute_distance_matrix(&depots, metric));

        Ok(Network { depots, distances, metric })
    }

    /// Compute the symmetric distance table, zero on the diagonal
    fn compute_distance_matrix(depots: &[Depot], metric: Metric) -> DistanceMatrix {
        let n = depots.len();
        let mut matrix = vec![vec![0.0; n]; n];

        for i in 0..n {
            for j in (i + 1)..n {
                let d = metric.distance(&depots[i].location, &depots[j].location);
                matrix[i][j] = d;
                matrix[j][i] = d;
            }
        }

        matrix
    }

    /// Number of depots
    pub fn len(&self) -> usize {
        self.depots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depots.is_empty()
    }

    pub fn depots(&self) -> &[Depot] {
        &self.depots
    }

    pub fn depot(&self, id: DepotId) -> &Depot {
        &self.depots[id]
    }

    #[inline]
    pub fn supply(&self, id: DepotId) -> i32 {
        self.depots[id].supply
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Distance between two depots.
    ///
    /// Panics if either identity is not part of the network.
    #[inline]
    pub fn distance(&self, from: DepotId, to: DepotId) -> f64 {
        self.distances[from][to]
    }

    /// Distances from `id` to every depot (its row of the table)
    pub fn connections(&self, id: DepotId) -> &[f64] {
        &self.distances[id]
    }

    pub fn distance_matrix(&self) -> &DistanceMatrix {
        &self.distances
    }

    /// Move `quantity` units from `from` to `to`. No validation of sign or
    /// magnitude is performed.
    #[inline]
    pub fn move_supply(&mut self, from: DepotId, to: DepotId, quantity: i32) {
        self.depots[from].supply -= quantity;
        self.depots[to].supply += quantity;
    }

    /// Identities of the depots currently in surplus
    pub fn surplus_ids(&self) -> Vec<DepotId> {
        self.depots.iter().filter(|d| d.is_surplus()).map(|d| d.id).collect()
    }

    /// Identities of the depots currently in deficit
    pub fn deficit_ids(&self) -> Vec<DepotId> {
        self.depots.iter().filter(|d| d.is_deficit()).map(|d| d.id).collect()
    }

    /// True iff every depot is balanced
    pub fn is_resolved(&self) -> bool {
        self.depots.iter().all(Depot::is_balanced)
    }

    pub fn total_supply(&self) -> i64 {
        self.depots.iter().map(|d| d.supply as i64).sum()
    }

    /// Sum of all positive supplies
    pub fn total_surplus(&self) -> i64 {
        self.depots.iter().filter(|d| d.is_surplus()).map(|d| d.supply as i64).sum()
    }

    /// Check the network can be handed to a search driver.
    pub fn check_searchable(&self) -> Result<(), SearchError> {
        if self.len() < 2 {
            return Err(SearchError::DegenerateNetwork(self.len()));
        }
        if self.is_resolved() {
            return Err(SearchError::NothingToResolve);
        }
        Ok(())
    }

    /// Parse a network from the line-based model format:
    /// `Depot: <id>, (x,y): (<x>,<y>), S: <s>`
    pub fn parse(text: &str, metric: Metric) -> Result<Self, NetworkError> {
        let mut entries: Vec<(usize, Location, i32)> = Vec::new();

        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let entry = parse_depot_line(line)
                .map_err(|reason| NetworkError::Parse { line: idx + 1, reason })?;
            entries.push(entry);
        }

        entries.sort_by_key(|&(id, _, _)| id);
        if entries.iter().enumerate().any(|(i, &(id, _, _))| i != id) {
            return Err(NetworkError::NonContiguousIds);
        }

        Self::new(entries.into_iter().map(|(_, loc, s)| (loc, s)).collect(), metric)
    }

    /// Load a network from a model file
    pub fn from_file<P: AsRef<Path>>(path: P, metric: Metric) -> Result<Self, NetworkError> {
        let file = File::open(&path)?;
        let reader = BufReader::new(file);

        let mut text = String::new();
        for line in reader.lines() {
            text.push_str(&line?);
            text.push('\n');
        }

        Self::parse(&text, metric)
    }

    /// Write the network in the model format, one depot per line
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), NetworkError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        for depot in &self.depots {
            writeln!(writer, "{}", depot)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Get statistics about the network
    pub fn statistics(&self) -> NetworkStatistics {
        let mut distances: Vec<f64> = Vec::new();
        for i in 0..self.len() {
            for j in (i + 1)..self.len() {
                distances.push(self.distance(i, j));
            }
        }
        let avg_distance = if distances.is_empty() {
            0.0
        } else {
            distances.iter().sum::<f64>() / distances.len() as f64
        };
        let max_distance = distances.iter().cloned().fold(0.0, f64::max);

        NetworkStatistics {
            depots: self.len(),
            num_surplus: self.surplus_ids().len(),
            num_deficit: self.deficit_ids().len(),
            num_balanced: self.depots.iter().filter(|d| d.is_balanced()).count(),
            total_surplus: self.total_surplus(),
            avg_distance,
            max_distance,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for depot in &self.depots {
            writeln!(f, "{}", depot)?;
        }
        Ok(())
    }
}

fn parse_depot_line(line: &str) -> Result<(usize, Location, i32), String> {
    let rest = line
        .strip_prefix("Depot:")
        .ok_or("expected line to start with 'Depot:'")?;
    let (id, rest) = rest.split_once(',').ok_or("missing ',' after depot id")?;
    let id: usize = id.trim().parse().map_err(|_| format!("invalid depot id '{}'", id.trim()))?;

    let rest = rest
        .trim()
        .strip_prefix("(x,y):")
        .ok_or("expected '(x,y):'")?
        .trim();
    let (coords, rest) = rest.split_once(')').ok_or("unterminated coordinates")?;
    let coords = coords.trim().strip_prefix('(').ok_or("expected '(' before coordinates")?;
    let (x, y) = coords.split_once(',').ok_or("expected 'x,y' coordinates")?;
    let x: f64 = x.trim().parse().map_err(|_| format!("invalid x coordinate '{}'", x.trim()))?;
    let y: f64 = y.trim().parse().map_err(|_| format!("invalid y coordinate '{}'", y.trim()))?;

    let supply = rest
        .trim()
        .strip_prefix(',')
        .ok_or("missing ',' before supply")?
        .trim()
        .strip_prefix("S:")
        .ok_or("expected 'S:'")?
        .trim();
    let supply: i32 = supply.parse().map_err(|_| format!("invalid supply '{}'", supply))?;

    Ok((id, Location::new(x, y), supply))
}

/// Parameters of the random network generator
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Number of depots
    pub depots: usize,
    /// Grid scale: depots are placed on a `(spread * depots)^2` integer grid
    pub spread: usize,
    /// Lowest supply a depot may hold (negative)
    pub max_deficit: i32,
    /// Highest supply a depot may hold (positive)
    pub max_surplus: i32,
    pub metric: Metric,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            depots: 10,
            spread: 2,
            max_deficit: -100,
            max_surplus: 100,
            metric: Metric::Euclidean,
        }
    }
}

/// Generate a random network: depots at unique grid positions, non-zero
/// supplies within `[max_deficit, max_surplus]` summing to zero.
pub fn generate<R: Rng + ?Sized>(config: &GeneratorConfig, rng: &mut R) -> Result<Network, NetworkError> {
    if config.depots < 2 {
        return Err(NetworkError::InvalidParameters(
            "at least 2 depots are needed for a zero-sum network".to_string(),
        ));
    }
    if config.spread < 1 {
        return Err(NetworkError::InvalidParameters("spread must be at least 1".to_string()));
    }
    if config.max_deficit >= 0 || config.max_surplus <= 0 {
        return Err(NetworkError::InvalidParameters(
            "max_deficit must be negative and max_surplus positive".to_string(),
        ));
    }

    let side = config.spread * config.depots;
    let cells = index::sample(rng, side * side, config.depots);
    let locations: Vec<Location> = cells
        .iter()
        .map(|cell| Location::new((cell % side) as f64, (cell / side) as f64))
        .collect();

    let supplies = generate_supplies(config.depots, config.max_deficit, config.max_surplus, rng);

    Network::new(locations.into_iter().zip(supplies).collect(), config.metric)
}

/// Draw `n` non-zero supplies summing to zero. The running total is kept
/// inside `[max_deficit, max_surplus]` so the balancing last value is in
/// range too.
fn generate_supplies<R: Rng + ?Sized>(n: usize, max_deficit: i32, max_surplus: i32, rng: &mut R) -> Vec<i32> {
    loop {
        let mut total = 0i32;
        let mut supplies = Vec::with_capacity(n);

        while supplies.len() < n - 1 {
            let value = if total < 0 {
                rng.gen_range((max_deficit - total)..=max_surplus)
            } else if total > 0 {
                rng.gen_range(max_deficit..=(max_surplus - total))
            } else {
                rng.gen_range(max_deficit..=max_surplus)
            };

            if value != 0 {
                total += value;
                supplies.push(value);
            }
        }

        if total != 0 {
            supplies.push(-total);
            return supplies;
        }
    }
}

/// Statistics about a TNRP network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkStatistics {
    pub depots: usize,
    pub num_surplus: usize,
    pub num_deficit: usize,
    pub num_balanced: usize,
    pub total_surplus: i64,
    pub avg_distance: f64,
    pub max_distance: f64,
}

impl fmt::Display for NetworkStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Network: {} depots", self.depots)?;
        writeln!(f, "  Surplus depots: {}", self.num_surplus)?;
        writeln!(f, "  Deficit depots: {}", self.num_deficit)?;
        writeln!(f, "  Balanced depots: {}", self.num_balanced)?;
        writeln!(f, "  Total surplus to move: {}", self.total_surplus)?;
        writeln!(f, "  Avg distance: {:.2}", self.avg_distance)?;
        writeln!(f, "  Max distance: {:.2}", self.max_distance)
    }
}
