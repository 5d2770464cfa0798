use std::collections::HashMap;
use std::convert::TryFrom;

use serde::{Deserialize, Serialize};

use crate::error::{Element, NetworkError};

pub type NodeID = usize;
pub type LinkID = usize;
pub type RequestID = usize;

/// Which side of the embedding a node belongs to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Substrate,
    Virtual(RequestID),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub role: NodeRole,
    pub capacity: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub endpoints: (NodeID, NodeID),
    pub capacity: usize,
}

/// Read access to residual capacities, either committed or speculative.
pub trait ResidualView {
    fn node_residual(&self, node: NodeID) -> usize;
    fn link_residual(&self, link: LinkID) -> usize;
}

/// Residual capacities of every node and link, indexed by id.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Residuals {
    nodes: Vec<usize>,
    links: Vec<usize>,
}

impl ResidualView for Residuals {
    fn node_residual(&self, node: NodeID) -> usize {
        self.nodes[node]
    }

    fn link_residual(&self, link: LinkID) -> usize {
        self.links[link]
    }
}

/**
 * An undirected capacitated graph. Used for the substrate and, with virtual roles,
 * for the graph of a single request when ranking its nodes.
 *
 * Each link is stored once under its canonical (low, high) endpoint pair, so both
 * directions always read and update the same residual.
 **/
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(try_from = "NetworkRecord", into = "NetworkRecord")]
pub struct Network {
    nodes: Vec<Node>,
    links: Vec<Link>,
    graph: Vec<Vec<(NodeID, LinkID)>>,
    link_lookup: HashMap<(NodeID, NodeID), LinkID>,
    residuals: Residuals,
}

/// On-disk form of a network. Adjacency and lookup are rebuilt on load.
#[derive(Serialize, Deserialize)]
pub struct NetworkRecord {
    nodes: Vec<Node>,
    links: Vec<Link>,
    residuals: Residuals,
}

impl TryFrom<NetworkRecord> for Network {
    type Error = NetworkError;

    fn try_from(record: NetworkRecord) -> Result<Self, Self::Error> {
        let links: Vec<_> = record
            .links
            .iter()
            .map(|l| (l.endpoints.0, l.endpoints.1, l.capacity))
            .collect();

        let mut network = Network::new(record.nodes, &links)?;
        network.restore(record.residuals)?;

        Ok(network)
    }
}

impl From<Network> for NetworkRecord {
    fn from(network: Network) -> Self {
        NetworkRecord {
            nodes: network.nodes,
            links: network.links,
            residuals: network.residuals,
        }
    }
}

impl Network {
    pub fn new(nodes: Vec<Node>, links: &[(NodeID, NodeID, usize)]) -> Result<Network, NetworkError> {
        let num_nodes = nodes.len();

        let mut graph = vec![Vec::new(); num_nodes];
        let mut link_lookup = HashMap::with_capacity(links.len());
        let mut all_links = Vec::with_capacity(links.len());

        for &(a, b, capacity) in links {
            if a >= num_nodes {
                return Err(NetworkError::UnknownNode(a));
            }
            if b >= num_nodes {
                return Err(NetworkError::UnknownNode(b));
            }
            if a == b {
                return Err(NetworkError::SelfLoop(a));
            }

            let key = canonical(a, b);
            if link_lookup.contains_key(&key) {
                return Err(NetworkError::DuplicateLink(key.0, key.1));
            }

            let link_id = all_links.len();
            link_lookup.insert(key, link_id);
            all_links.push(Link {
                endpoints: key,
                capacity,
            });

            graph[a].push((b, link_id));
            graph[b].push((a, link_id));
        }

        // Lowest id first keeps every traversal deterministic
        for neighbours in graph.iter_mut() {
            neighbours.sort();
        }

        let residuals = Residuals {
            nodes: nodes.iter().map(|n| n.capacity).collect(),
            links: all_links.iter().map(|l| l.capacity).collect(),
        };

        Ok(Network {
            nodes,
            links: all_links,
            graph,
            link_lookup,
            residuals,
        })
    }

    pub fn substrate(
        capacities: Vec<usize>,
        links: &[(NodeID, NodeID, usize)],
    ) -> Result<Network, NetworkError> {
        let nodes = capacities
            .into_iter()
            .map(|capacity| Node {
                role: NodeRole::Substrate,
                capacity,
            })
            .collect();

        Network::new(nodes, links)
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_links(&self) -> usize {
        self.links.len()
    }

    pub fn node(&self, node: NodeID) -> &Node {
        &self.nodes[node]
    }

    pub fn link(&self, link: LinkID) -> &Link {
        &self.links[link]
    }

    pub fn links(&self) -> &Vec<Link> {
        &self.links
    }

    pub fn contains(&self, node: NodeID) -> bool {
        node < self.nodes.len()
    }

    pub fn link_between(&self, a: NodeID, b: NodeID) -> Option<LinkID> {
        self.link_lookup.get(&canonical(a, b)).copied()
    }

    /// Neighbours with the connecting link, ascending by neighbour id.
    pub fn incident(&self, node: NodeID) -> &Vec<(NodeID, LinkID)> {
        &self.graph[node]
    }

    pub fn neighbours(&self, node: NodeID) -> impl Iterator<Item = NodeID> + '_ {
        self.graph[node].iter().map(|&(n, _)| n)
    }

    pub fn degree(&self, node: NodeID) -> usize {
        self.graph[node].len()
    }

    pub fn residual_of_node(&self, node: NodeID) -> Result<usize, NetworkError> {
        if !self.contains(node) {
            return Err(NetworkError::UnknownNode(node));
        }

        Ok(self.residuals.nodes[node])
    }

    pub fn residual_of_link(&self, a: NodeID, b: NodeID) -> Result<usize, NetworkError> {
        let link = self
            .link_between(a, b)
            .ok_or(NetworkError::UnknownLink(a, b))?;

        Ok(self.residuals.links[link])
    }

    pub fn apply_node_delta(&mut self, node: NodeID, delta: isize) -> Result<(), NetworkError> {
        if !self.contains(node) {
            return Err(NetworkError::UnknownNode(node));
        }

        let updated = checked_delta(
            Element::Node(node),
            self.residuals.nodes[node],
            self.nodes[node].capacity,
            delta,
        )?;
        self.residuals.nodes[node] = updated;

        Ok(())
    }

    /// Updates both directions of the link at once.
    pub fn apply_link_delta(&mut self, a: NodeID, b: NodeID, delta: isize) -> Result<(), NetworkError> {
        let link = self
            .link_between(a, b)
            .ok_or(NetworkError::UnknownLink(a, b))?;

        let updated = checked_delta(
            Element::Link(a, b),
            self.residuals.links[link],
            self.links[link].capacity,
            delta,
        )?;
        self.residuals.links[link] = updated;

        Ok(())
    }

    pub fn residuals(&self) -> &Residuals {
        &self.residuals
    }

    pub fn snapshot(&self) -> Residuals {
        self.residuals.clone()
    }

    /// Replaces every residual at once. Nothing changes unless the whole
    /// snapshot fits this network's shape and capacities.
    pub fn restore(&mut self, snapshot: Residuals) -> Result<(), NetworkError> {
        if snapshot.nodes.len() != self.nodes.len() || snapshot.links.len() != self.links.len() {
            return Err(NetworkError::SnapshotMismatch);
        }

        for (i, (&residual, node)) in snapshot.nodes.iter().zip(&self.nodes).enumerate() {
            if residual > node.capacity {
                return Err(NetworkError::CapacityViolation {
                    element: Element::Node(i),
                    residual,
                    capacity: node.capacity,
                    delta: 0,
                });
            }
        }

        for (&residual, link) in snapshot.links.iter().zip(&self.links) {
            if residual > link.capacity {
                return Err(NetworkError::CapacityViolation {
                    element: Element::Link(link.endpoints.0, link.endpoints.1),
                    residual,
                    capacity: link.capacity,
                    delta: 0,
                });
            }
        }

        self.residuals = snapshot;

        Ok(())
    }

    /// A speculative copy of the current residuals.
    pub fn overlay(&self) -> Overlay<'_> {
        Overlay {
            network: self,
            residuals: self.snapshot(),
        }
    }

    pub fn total_node_capacity(&self) -> usize {
        self.nodes.iter().map(|n| n.capacity).sum()
    }

    pub fn total_link_capacity(&self) -> usize {
        self.links.iter().map(|l| l.capacity).sum()
    }

    pub fn total_node_residual(&self) -> usize {
        self.residuals.nodes.iter().sum()
    }

    pub fn total_link_residual(&self) -> usize {
        self.residuals.links.iter().sum()
    }
}

impl ResidualView for Network {
    fn node_residual(&self, node: NodeID) -> usize {
        self.residuals.nodes[node]
    }

    fn link_residual(&self, link: LinkID) -> usize {
        self.residuals.links[link]
    }
}

/// Copy-on-write residuals for one embedding attempt. Changes only reach the
/// network through `Network::restore`.
pub struct Overlay<'a> {
    network: &'a Network,
    residuals: Residuals,
}

impl<'a> Overlay<'a> {
    pub fn network(&self) -> &'a Network {
        self.network
    }

    pub fn apply_node_delta(&mut self, node: NodeID, delta: isize) -> Result<(), NetworkError> {
        let capacity = self.network.node(node).capacity;
        let residual = &mut self.residuals.nodes[node];
        *residual = checked_delta(Element::Node(node), *residual, capacity, delta)?;

        Ok(())
    }

    pub fn apply_link_delta(&mut self, a: NodeID, b: NodeID, delta: isize) -> Result<(), NetworkError> {
        let link = self
            .network
            .link_between(a, b)
            .ok_or(NetworkError::UnknownLink(a, b))?;
        let capacity = self.network.link(link).capacity;
        let residual = &mut self.residuals.links[link];
        *residual = checked_delta(Element::Link(a, b), *residual, capacity, delta)?;

        Ok(())
    }

    /// Applies `delta` to every link along `path`. On failure the links
    /// already updated are put back.
    pub fn apply_path_delta(&mut self, path: &[NodeID], delta: isize) -> Result<(), NetworkError> {
        for (i, hop) in path.windows(2).enumerate() {
            if let Err(err) = self.apply_link_delta(hop[0], hop[1], delta) {
                for undo in path.windows(2).take(i) {
                    self.apply_link_delta(undo[0], undo[1], -delta)?;
                }
                return Err(err);
            }
        }

        Ok(())
    }

    pub fn into_residuals(self) -> Residuals {
        self.residuals
    }
}

impl ResidualView for Overlay<'_> {
    fn node_residual(&self, node: NodeID) -> usize {
        self.residuals.nodes[node]
    }

    fn link_residual(&self, link: LinkID) -> usize {
        self.residuals.links[link]
    }
}

fn canonical(a: NodeID, b: NodeID) -> (NodeID, NodeID) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn checked_delta(
    element: Element,
    residual: usize,
    capacity: usize,
    delta: isize,
) -> Result<usize, NetworkError> {
    let updated = residual as i128 + delta as i128;

    if updated < 0 || updated > capacity as i128 {
        return Err(NetworkError::CapacityViolation {
            element,
            residual,
            capacity,
            delta,
        });
    }

    Ok(updated as usize)
}
