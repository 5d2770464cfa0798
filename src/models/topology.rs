use std::fmt::Display;
use std::str::FromStr;

use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::error::{NetworkError, UnknownName};
use crate::models::network::{Network, NodeID};

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Topology {
    FatTree,
    LeafSpine,
    Random,
}

impl Display for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Topology::FatTree => write!(f, "FatTree"),
            Topology::LeafSpine => write!(f, "LeafSpine"),
            Topology::Random => write!(f, "Random"),
        }
    }
}

impl FromStr for Topology {
    type Err = UnknownName;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "fat-tree" => Ok(Topology::FatTree),
            "leaf-spine" => Ok(Topology::LeafSpine),
            "random" => Ok(Topology::Random),
            _ => Err(UnknownName {
                kind: "topology",
                name: name.to_string(),
            }),
        }
    }
}

/// The shape of a substrate. Servers are numbered first, switches after.
#[derive(Debug, Clone)]
pub struct Layout {
    pub num_nodes: usize,
    pub num_servers: usize,
    pub edges: Vec<(NodeID, NodeID)>,
}

impl Layout {
    pub fn is_server(&self, node_id: NodeID) -> bool {
        node_id < self.num_servers
    }
}

pub struct FatTree;
impl FatTree {
    pub fn new(num_ports: usize) -> Layout {
        let half = num_ports / 2;

        let num_servers = num_ports.pow(3) / 4;
        let num_edges = num_ports * half;
        let num_agg = num_edges;
        let num_core = half.pow(2);

        let edg_off = num_servers;
        let agg_off = num_servers + num_edges;
        let cor_off = num_servers + num_edges + num_agg;

        let mut edges = Vec::new();

        for i in 0..num_servers {
            let edge_id = i / half; // usize rounds towards zero
            edges.push((i, edge_id + edg_off));
        }

        for i in 0..num_edges {
            // connect aggregate switches in the same pod
            let agg_min = (i / half) * half;
            for j in agg_min..agg_min + half {
                edges.push((i + edg_off, j + agg_off));
            }
        }

        for i in 0..num_agg {
            // connect core switches
            let mut j = i % half;
            while j < num_core {
                edges.push((i + agg_off, j + cor_off));
                j += half;
            }
        }

        Layout {
            num_nodes: num_servers + num_edges + num_agg + num_core,
            num_servers,
            edges,
        }
    }
}

pub struct LeafSpine;
impl LeafSpine {
    pub fn new(num_ports: usize, num_spine: usize) -> Layout {
        let num_leaf = num_ports;
        let per_leaf = num_ports.saturating_sub(num_spine);
        let num_servers = per_leaf * num_leaf;

        let leaf_off = num_servers;
        let spin_off = num_servers + num_leaf;

        let mut edges = Vec::new();

        for i in 0..num_servers {
            // connect leaf nodes
            let leaf_id = i / per_leaf;
            edges.push((i, leaf_id + leaf_off));
        }

        for i in 0..num_leaf {
            // connect spine
            for j in 0..num_spine {
                edges.push((i + leaf_off, j + spin_off));
            }
        }

        Layout {
            num_nodes: num_servers + num_leaf + num_spine,
            num_servers,
            edges,
        }
    }
}

/// Every node is a server. A chain through all nodes keeps the graph
/// connected; every other pair is linked with `link_probability`.
pub struct RandomGraph;
impl RandomGraph {
    pub fn new<R: Rng>(num_nodes: usize, link_probability: f64, rng: &mut R) -> Layout {
        let mut edges = Vec::new();

        for a in 0..num_nodes {
            for b in a + 1..num_nodes {
                if b == a + 1 || rng.gen_bool(link_probability) {
                    edges.push((a, b));
                }
            }
        }

        Layout {
            num_nodes,
            num_servers: num_nodes,
            edges,
        }
    }
}

/// Draws capacities for a layout. Switches get no CRB, so they only forward.
#[derive(Debug, Clone)]
pub struct SubstrateGenerator {
    pub node_capacity: (usize, usize),
    pub link_capacity: (usize, usize),
}

impl SubstrateGenerator {
    pub fn build<R: Rng>(&self, layout: &Layout, rng: &mut R) -> Result<Network, NetworkError> {
        let node_distr = Uniform::new_inclusive(self.node_capacity.0, self.node_capacity.1);
        let link_distr = Uniform::new_inclusive(self.link_capacity.0, self.link_capacity.1);

        let capacities = (0..layout.num_nodes)
            .map(|n| {
                if layout.is_server(n) {
                    node_distr.sample(rng)
                } else {
                    0
                }
            })
            .collect();

        let links: Vec<_> = layout
            .edges
            .iter()
            .map(|&(a, b)| (a, b, link_distr.sample(rng)))
            .collect();

        Network::substrate(capacities, &links)
    }
}

// ----- Unit tests ---- //
#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::path_finder::find_path;
    use rand::{rngs::StdRng, SeedableRng};

    fn assert_connected(network: &Network) {
        for node in 1..network.num_nodes() {
            assert!(find_path(network, 0, node, 0).unwrap().is_some());
        }
    }

    fn generator() -> SubstrateGenerator {
        SubstrateGenerator {
            node_capacity: (50, 100),
            link_capacity: (50, 100),
        }
    }

    #[test]
    fn test_fat_tree() {
        let layout = FatTree::new(4);

        assert_eq!(layout.num_servers, 16);
        assert_eq!(layout.num_nodes, 36);
        assert_eq!(layout.edges.len(), 48);

        let network = generator().build(&layout, &mut StdRng::seed_from_u64(0)).unwrap();
        assert_connected(&network);

        // Servers hang off one edge switch, core switches see every pod
        assert_eq!(network.degree(0), 1);
        assert_eq!(network.degree(35), 4);
    }

    #[test]
    fn test_leaf_spine() {
        let layout = LeafSpine::new(6, 2);

        assert_eq!(layout.num_servers, 24);
        assert_eq!(layout.num_nodes, 32);
        assert_eq!(layout.edges.len(), 36);

        let network = generator().build(&layout, &mut StdRng::seed_from_u64(0)).unwrap();
        assert_connected(&network);

        // Leaf: 4 servers and 2 spines
        assert_eq!(network.degree(24), 6);
        assert_eq!(network.degree(31), 6);
    }

    #[test]
    fn test_random_graph() {
        let mut rng = StdRng::seed_from_u64(8);
        let layout = RandomGraph::new(12, 0.2, &mut rng);

        assert_eq!(layout.num_servers, 12);
        assert!(layout.edges.len() >= 11);

        let network = generator().build(&layout, &mut rng).unwrap();
        assert_connected(&network);
    }

    #[test]
    fn test_capacities() {
        let layout = LeafSpine::new(4, 2);
        let network = generator().build(&layout, &mut StdRng::seed_from_u64(1)).unwrap();

        for node in 0..network.num_nodes() {
            let capacity = network.node(node).capacity;

            if layout.is_server(node) {
                assert!(capacity >= 50 && capacity <= 100);
            } else {
                assert_eq!(capacity, 0);
            }
        }

        for link in network.links() {
            assert!(link.capacity >= 50 && link.capacity <= 100);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Topology::LeafSpine.to_string(), "LeafSpine");
        assert_eq!(Topology::FatTree.to_string(), "FatTree");
        assert_eq!("leaf-spine".parse::<Topology>(), Ok(Topology::LeafSpine));
        assert!("dcell".parse::<Topology>().is_err());
    }
}
