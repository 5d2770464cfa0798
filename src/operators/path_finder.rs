use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::PathError;
use crate::models::network::{Network, NodeID, ResidualView};

/// Nodes from source to destination, both included.
pub type Path = Vec<NodeID>;

/**
 * How a bandwidth-feasible path is searched for. Both variants return the
 * path with the fewest hops, ties going to the path that comes first when
 * neighbours are expanded lowest id first.
 **/
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PathSearch {
    Bfs,
    /// Depth first enumeration of simple paths, giving up after
    /// `max_expansions` link traversals.
    Enumerate { max_expansions: usize },
}

impl Default for PathSearch {
    fn default() -> Self {
        PathSearch::Bfs
    }
}

impl PathSearch {
    /// `Ok(None)` when no path has residual >= `bandwidth` on every link.
    pub fn find<R: ResidualView>(
        &self,
        network: &Network,
        residuals: &R,
        source: NodeID,
        destination: NodeID,
        bandwidth: usize,
    ) -> Result<Option<Path>, PathError> {
        for &node in &[source, destination] {
            if !network.contains(node) {
                return Err(PathError::UnknownNode(node));
            }
        }

        if source == destination {
            return Err(PathError::SameEndpoints(source));
        }

        match self {
            PathSearch::Bfs => Ok(bfs(network, residuals, source, destination, bandwidth)),
            PathSearch::Enumerate { max_expansions } => enumerate(
                network,
                residuals,
                source,
                destination,
                bandwidth,
                *max_expansions,
            ),
        }
    }
}

/// Shortest feasible path against the committed residuals of `network`.
pub fn find_path(
    network: &Network,
    source: NodeID,
    destination: NodeID,
    bandwidth: usize,
) -> Result<Option<Path>, PathError> {
    PathSearch::Bfs.find(network, network, source, destination, bandwidth)
}

fn bfs<R: ResidualView>(
    network: &Network,
    residuals: &R,
    source: NodeID,
    destination: NodeID,
    bandwidth: usize,
) -> Option<Path> {
    let mut prev: Vec<Option<NodeID>> = vec![None; network.num_nodes()];
    let mut visited = vec![false; network.num_nodes()];
    let mut queue = VecDeque::new();

    visited[source] = true;
    queue.push_back(source);

    while let Some(curr) = queue.pop_front() {
        for &(next, link) in network.incident(curr) {
            if visited[next] || residuals.link_residual(link) < bandwidth {
                continue;
            }

            visited[next] = true;
            prev[next] = Some(curr);

            if next == destination {
                return Some(trace_back(&prev, destination));
            }

            queue.push_back(next);
        }
    }

    None
}

fn trace_back(prev: &[Option<NodeID>], destination: NodeID) -> Path {
    let mut path = vec![destination];
    let mut curr = destination;

    while let Some(p) = prev[curr] {
        path.push(p);
        curr = p;
    }

    path.reverse();
    path
}

fn enumerate<R: ResidualView>(
    network: &Network,
    residuals: &R,
    source: NodeID,
    destination: NodeID,
    bandwidth: usize,
    max_expansions: usize,
) -> Result<Option<Path>, PathError> {
    let mut visited = vec![false; network.num_nodes()];
    let mut best: Option<Path> = None;
    let mut expansions = 0;

    // Current path and, per node on it, the next incident link to try
    let mut path = vec![source];
    let mut cursors = vec![0];
    visited[source] = true;

    while let Some(&curr) = path.last() {
        let top = cursors.len() - 1;
        let incident = network.incident(curr);

        // Only strictly shorter paths can replace the best one
        let hops = path.len();
        let can_improve = best.as_ref().map_or(true, |b| hops < b.len() - 1);

        if !can_improve || cursors[top] >= incident.len() {
            visited[curr] = false;
            path.pop();
            cursors.pop();
            continue;
        }

        let (next, link) = incident[cursors[top]];
        cursors[top] += 1;

        if visited[next] || residuals.link_residual(link) < bandwidth {
            continue;
        }

        expansions += 1;
        if expansions > max_expansions {
            return Err(PathError::SearchBudgetExhausted(max_expansions));
        }

        if next == destination {
            let mut found = path.clone();
            found.push(next);
            best = Some(found);
            continue;
        }

        visited[next] = true;
        path.push(next);
        cursors.push(0);
    }

    Ok(best)
}
