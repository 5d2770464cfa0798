use std::collections::VecDeque;

use log::warn;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::{Deserialize, Serialize};

use crate::error::CentralityError;
use crate::models::network::{Network, NodeID, ResidualView};
use crate::utilities::math::{euclidean_norm, normalise};

pub const EIGENVECTOR_TOLERANCE: f64 = 1.0e-6;
pub const EIGENVECTOR_MAX_ITERATIONS: usize = 10_000;

/// The per-node features used as ranking criteria.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Criterion {
    Crb,
    BandwidthStrength,
    Betweenness,
    Eigenvector,
    Degree,
}

impl Criterion {
    pub const ALL: [Criterion; 5] = [
        Criterion::Crb,
        Criterion::BandwidthStrength,
        Criterion::Betweenness,
        Criterion::Eigenvector,
        Criterion::Degree,
    ];
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeVector {
    pub crb: f64,
    pub bandwidth_strength: f64,
    pub betweenness: f64,
    pub eigenvector: f64,
    pub degree: f64,
}

impl AttributeVector {
    pub fn get(&self, criterion: Criterion) -> f64 {
        match criterion {
            Criterion::Crb => self.crb,
            Criterion::BandwidthStrength => self.bandwidth_strength,
            Criterion::Betweenness => self.betweenness,
            Criterion::Eigenvector => self.eigenvector,
            Criterion::Degree => self.degree,
        }
    }

    fn set(&mut self, criterion: Criterion, value: f64) {
        match criterion {
            Criterion::Crb => self.crb = value,
            Criterion::BandwidthStrength => self.bandwidth_strength = value,
            Criterion::Betweenness => self.betweenness = value,
            Criterion::Eigenvector => self.eigenvector = value,
            Criterion::Degree => self.degree = value,
        }
    }
}

/// One attribute vector per node, indexed by node id.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeMatrix {
    rows: Vec<AttributeVector>,
}

impl AttributeMatrix {
    /// Raw attributes from the current residual state. Never cached: call
    /// again after the network changes.
    pub fn compute(network: &Network) -> AttributeMatrix {
        let crb = residual_crb(network);
        let strength = bandwidth_strength(network);
        let betweenness = betweenness_centrality(network);
        let eigenvector = eigenvector_centrality(
            network,
            EIGENVECTOR_TOLERANCE,
            EIGENVECTOR_MAX_ITERATIONS,
        )
        .unwrap_or_else(|err| {
            warn!("{}, using the last iterate", err);
            match err {
                CentralityError::Nonconvergence { last_iterate, .. } => last_iterate,
            }
        });
        let degree = degree(network);

        let rows = (0..network.num_nodes())
            .map(|i| AttributeVector {
                crb: crb[i],
                bandwidth_strength: strength[i],
                betweenness: betweenness[i],
                eigenvector: eigenvector[i],
                degree: degree[i],
            })
            .collect();

        AttributeMatrix { rows }
    }

    /// Each column divided by its Euclidean norm across all nodes.
    pub fn normalised(&self) -> AttributeMatrix {
        let mut rows = self.rows.clone();

        for &criterion in Criterion::ALL.iter() {
            let column = normalise(&self.column(criterion));

            for (row, value) in rows.iter_mut().zip(column) {
                row.set(criterion, value);
            }
        }

        AttributeMatrix { rows }
    }

    pub fn num_nodes(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, node: NodeID) -> &AttributeVector {
        &self.rows[node]
    }

    pub fn column(&self, criterion: Criterion) -> Vec<f64> {
        self.rows.iter().map(|r| r.get(criterion)).collect()
    }

    /// Decision matrix restricted to `criteria`, one row per node.
    pub fn select(&self, criteria: &[Criterion]) -> Vec<Vec<f64>> {
        self.rows
            .iter()
            .map(|r| criteria.iter().map(|&c| r.get(c)).collect())
            .collect()
    }
}

/// Normalised attributes, ready for a ranking strategy.
pub fn node_attributes(network: &Network) -> AttributeMatrix {
    AttributeMatrix::compute(network).normalised()
}

pub fn residual_crb(network: &Network) -> Vec<f64> {
    (0..network.num_nodes())
        .map(|n| network.node_residual(n) as f64)
        .collect()
}

pub fn degree(network: &Network) -> Vec<f64> {
    (0..network.num_nodes())
        .map(|n| network.degree(n) as f64)
        .collect()
}

/// Sum of the residual bandwidth of every incident link.
pub fn bandwidth_strength(network: &Network) -> Vec<f64> {
    (0..network.num_nodes())
        .map(|n| {
            network
                .incident(n)
                .iter()
                .map(|&(_, link)| network.link_residual(link) as f64)
                .sum()
        })
        .collect()
}

/**
 * Brandes' algorithm over the unweighted adjacency. Scores are the fraction of
 * ordered source/target pairs whose shortest paths pass through the node, i.e.
 * normalised by (n - 1)(n - 2).
 *
 * Sources are processed in parallel but summed in source order, so the result
 * does not depend on scheduling.
 **/
pub fn betweenness_centrality(network: &Network) -> Vec<f64> {
    let n = network.num_nodes();

    let dependencies: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|source| single_source_dependencies(network, source))
        .collect();

    let mut betweenness = vec![0.0; n];
    for delta in dependencies {
        for (b, d) in betweenness.iter_mut().zip(delta) {
            *b += d;
        }
    }

    if n <= 2 {
        return vec![0.0; n];
    }

    let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
    betweenness.iter().map(|b| b * scale).collect()
}

fn single_source_dependencies(network: &Network, source: NodeID) -> Vec<f64> {
    let n = network.num_nodes();

    let mut stack = Vec::with_capacity(n);
    let mut predecessors: Vec<Vec<NodeID>> = vec![Vec::new(); n];
    let mut num_paths = vec![0.0; n];
    let mut distance: Vec<Option<usize>> = vec![None; n];

    num_paths[source] = 1.0;
    distance[source] = Some(0);

    let mut queue = VecDeque::new();
    queue.push_back(source);

    while let Some(curr) = queue.pop_front() {
        stack.push(curr);
        let next_dist = distance[curr].map(|d| d + 1);

        for next in network.neighbours(curr) {
            if distance[next].is_none() {
                distance[next] = next_dist;
                queue.push_back(next);
            }

            if distance[next] == next_dist {
                num_paths[next] += num_paths[curr];
                predecessors[next].push(curr);
            }
        }
    }

    let mut delta = vec![0.0; n];
    while let Some(node) = stack.pop() {
        for &pred in &predecessors[node] {
            delta[pred] += num_paths[pred] / num_paths[node] * (1.0 + delta[node]);
        }
    }
    delta[source] = 0.0;

    delta
}

/**
 * Power iteration on (A + I), which has the eigenvectors of A but cannot
 * oscillate on bipartite graphs. Converged when the summed absolute change
 * drops below `n * tolerance`.
 *
 * The result is only defined up to scale, so only compare normalised scores.
 **/
pub fn eigenvector_centrality(
    network: &Network,
    tolerance: f64,
    max_iterations: usize,
) -> Result<Vec<f64>, CentralityError> {
    let n = network.num_nodes();
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut x = vec![1.0 / n as f64; n];

    for _ in 0..max_iterations {
        let last = x.clone();

        for node in 0..n {
            for neighbour in network.neighbours(node) {
                x[neighbour] += last[node];
            }
        }

        let norm = euclidean_norm(&x);
        let norm = if norm == 0.0 { 1.0 } else { norm };
        for value in x.iter_mut() {
            *value /= norm;
        }

        let change: f64 = x.iter().zip(&last).map(|(a, b)| (a - b).abs()).sum();
        if change < n as f64 * tolerance {
            return Ok(x);
        }
    }

    Err(CentralityError::Nonconvergence {
        iterations: max_iterations,
        last_iterate: x,
    })
}
