use std::collections::HashSet;
use std::ops::RangeInclusive;

use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::error::{NetworkError, RequestError};
use crate::models::network::{Network, Node, NodeRole, RequestID};

/// Virtual nodes are numbered from 1 within their request.
pub type VirtualNodeID = usize;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VirtualLink {
    pub endpoints: (VirtualNodeID, VirtualNodeID),
    pub bandwidth: usize,
}

impl VirtualLink {
    /// The opposite endpoint, if `node` is on this link.
    pub fn other(&self, node: VirtualNodeID) -> Option<VirtualNodeID> {
        match self.endpoints {
            (a, b) if a == node => Some(b),
            (a, b) if b == node => Some(a),
            _ => None,
        }
    }
}

/// A tenant's demand graph. Immutable once validated.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VirtualNetworkRequest {
    id: RequestID,
    cpu_demands: Vec<usize>,
    links: Vec<VirtualLink>,
}

impl VirtualNetworkRequest {
    /// `link_demands` holds `(node_a, node_b, bandwidth)` with 1-based node ids.
    pub fn new(
        id: RequestID,
        num_nodes: usize,
        cpu_demands: Vec<usize>,
        link_demands: &[(VirtualNodeID, VirtualNodeID, usize)],
    ) -> Result<VirtualNetworkRequest, RequestError> {
        if num_nodes == 0 {
            return Err(RequestError::Empty);
        }

        if cpu_demands.len() != num_nodes {
            return Err(RequestError::NodeCountMismatch {
                declared: num_nodes,
                given: cpu_demands.len(),
            });
        }

        let links = link_demands
            .iter()
            .map(|&(a, b, bandwidth)| VirtualLink {
                endpoints: (a, b),
                bandwidth,
            })
            .collect();

        let request = VirtualNetworkRequest {
            id,
            cpu_demands,
            links,
        };
        request.validate()?;

        Ok(request)
    }

    /// Checks the link list against the node range. Requests built through
    /// `new` always pass; deserialised ones might not.
    pub fn validate(&self) -> Result<(), RequestError> {
        let num_nodes = self.cpu_demands.len();
        if num_nodes == 0 {
            return Err(RequestError::Empty);
        }

        let mut seen = HashSet::new();

        for link in &self.links {
            let (a, b) = link.endpoints;

            for &node in &[a, b] {
                if node == 0 || node > num_nodes {
                    return Err(RequestError::NodeOutOfRange { node, num_nodes });
                }
            }

            if a == b {
                return Err(RequestError::SelfLoop(a));
            }

            if !seen.insert((a.min(b), a.max(b))) {
                return Err(RequestError::DuplicateLink(a.min(b), a.max(b)));
            }
        }

        Ok(())
    }

    pub fn id(&self) -> RequestID {
        self.id
    }

    pub fn num_nodes(&self) -> usize {
        self.cpu_demands.len()
    }

    pub fn nodes(&self) -> RangeInclusive<VirtualNodeID> {
        1..=self.cpu_demands.len()
    }

    pub fn cpu_demand(&self, node: VirtualNodeID) -> usize {
        self.cpu_demands[node - 1]
    }

    pub fn links(&self) -> &Vec<VirtualLink> {
        &self.links
    }

    pub fn links_of(&self, node: VirtualNodeID) -> impl Iterator<Item = &VirtualLink> {
        self.links.iter().filter(move |l| l.other(node).is_some())
    }

    pub fn total_cpu(&self) -> usize {
        self.cpu_demands.iter().sum()
    }

    pub fn total_bandwidth(&self) -> usize {
        self.links.iter().map(|l| l.bandwidth).sum()
    }

    /// Everything the tenant asks for, compute and bandwidth alike.
    pub fn revenue(&self) -> usize {
        self.total_cpu() + self.total_bandwidth()
    }

    /// The request as a graph with 0-based node ids (`virtual id - 1`), where
    /// capacities carry the demands. Used for ranking virtual nodes.
    pub fn to_network(&self) -> Result<Network, NetworkError> {
        let nodes = self
            .cpu_demands
            .iter()
            .map(|&capacity| Node {
                role: NodeRole::Virtual(self.id),
                capacity,
            })
            .collect();

        let links: Vec<_> = self
            .links
            .iter()
            .map(|l| (l.endpoints.0 - 1, l.endpoints.1 - 1, l.bandwidth))
            .collect();

        Network::new(nodes, &links)
    }
}

/// Random request generator used by the experiment runner.
#[derive(Debug, Clone)]
pub struct RequestGenerator {
    pub num_nodes: (usize, usize),
    pub cpu_demand: (usize, usize),
    pub bw_demand: (usize, usize),
    pub link_probability: f64,
}

impl RequestGenerator {
    /// Generates a connected request: a random spanning tree plus extra links.
    pub fn generate<R: Rng>(
        &self,
        id: RequestID,
        rng: &mut R,
    ) -> Result<VirtualNetworkRequest, RequestError> {
        let size_distr = Uniform::new_inclusive(self.num_nodes.0.max(1), self.num_nodes.1.max(1));
        let cpu_distr = Uniform::new_inclusive(self.cpu_demand.0, self.cpu_demand.1);
        let bw_distr = Uniform::new_inclusive(self.bw_demand.0, self.bw_demand.1);

        let num_nodes = size_distr.sample(rng);
        let cpu_demands = (0..num_nodes).map(|_| cpu_distr.sample(rng)).collect();

        let mut links = Vec::new();
        let mut linked = HashSet::new();

        for v in 2..=num_nodes {
            let u = rng.gen_range(1, v);
            links.push((u, v, bw_distr.sample(rng)));
            linked.insert((u, v));
        }

        for a in 1..=num_nodes {
            for b in a + 1..=num_nodes {
                if !linked.contains(&(a, b)) && rng.gen_bool(self.link_probability) {
                    links.push((a, b, bw_distr.sample(rng)));
                }
            }
        }

        VirtualNetworkRequest::new(id, num_nodes, cpu_demands, &links)
    }
}

// ----- Unit tests ---- //
#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_new_request() {
        let vnr =
            VirtualNetworkRequest::new(3, 4, vec![45, 10, 5, 15], &[(1, 2, 5), (2, 3, 3), (2, 4, 6), (3, 4, 7)])
                .unwrap();

        assert_eq!(vnr.id(), 3);
        assert_eq!(vnr.num_nodes(), 4);
        assert_eq!(vnr.nodes().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert_eq!(vnr.cpu_demand(1), 45);
        assert_eq!(vnr.total_cpu(), 75);
        assert_eq!(vnr.total_bandwidth(), 21);
        assert_eq!(vnr.revenue(), 96);
        assert_eq!(vnr.links_of(2).count(), 3);
        assert_eq!(vnr.links()[0].other(2), Some(1));
        assert_eq!(vnr.links()[0].other(3), None);
    }

    #[test]
    fn test_invalid_requests() {
        assert_eq!(
            VirtualNetworkRequest::new(0, 0, vec![], &[]),
            Err(RequestError::Empty)
        );
        assert_eq!(
            VirtualNetworkRequest::new(0, 3, vec![1, 2], &[]),
            Err(RequestError::NodeCountMismatch {
                declared: 3,
                given: 2
            })
        );
        assert_eq!(
            VirtualNetworkRequest::new(0, 2, vec![1, 2], &[(1, 3, 4)]),
            Err(RequestError::NodeOutOfRange {
                node: 3,
                num_nodes: 2
            })
        );
        assert_eq!(
            VirtualNetworkRequest::new(0, 2, vec![1, 2], &[(0, 1, 4)]),
            Err(RequestError::NodeOutOfRange {
                node: 0,
                num_nodes: 2
            })
        );
        assert_eq!(
            VirtualNetworkRequest::new(0, 2, vec![1, 2], &[(2, 2, 4)]),
            Err(RequestError::SelfLoop(2))
        );
        assert_eq!(
            VirtualNetworkRequest::new(0, 2, vec![1, 2], &[(1, 2, 4), (2, 1, 1)]),
            Err(RequestError::DuplicateLink(1, 2))
        );
    }

    #[test]
    fn test_validate_deserialised() {
        let bad_link = VirtualLink {
            endpoints: (1, 4),
            bandwidth: 2,
        };
        let bytes = bincode::serialize(&(5usize, vec![1usize, 2, 3], vec![bad_link])).unwrap();
        let vnr: VirtualNetworkRequest = bincode::deserialize(&bytes).unwrap();

        assert_eq!(vnr.id(), 5);
        assert_eq!(
            vnr.validate(),
            Err(RequestError::NodeOutOfRange {
                node: 4,
                num_nodes: 3
            })
        );
    }

    #[test]
    fn test_to_network() {
        let vnr = VirtualNetworkRequest::new(7, 3, vec![4, 5, 6], &[(1, 3, 2), (3, 2, 9)]).unwrap();
        let net = vnr.to_network().unwrap();

        assert_eq!(net.num_nodes(), 3);
        assert_eq!(net.node(0).role, NodeRole::Virtual(7));
        assert_eq!(net.node(2).capacity, 6);
        assert_eq!(net.residual_of_link(0, 2).unwrap(), 2);
        assert_eq!(net.residual_of_link(2, 1).unwrap(), 9);
        assert_eq!(net.neighbours(2).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_generator() {
        let generator = RequestGenerator {
            num_nodes: (2, 6),
            cpu_demand: (5, 25),
            bw_demand: (5, 20),
            link_probability: 0.3,
        };

        let mut rng = StdRng::seed_from_u64(11);
        for id in 0..50 {
            let vnr = generator.generate(id, &mut rng).unwrap();

            assert!(vnr.num_nodes() >= 2 && vnr.num_nodes() <= 6);
            // Spanning tree at least
            assert!(vnr.links().len() >= vnr.num_nodes() - 1);

            for node in vnr.nodes() {
                let demand = vnr.cpu_demand(node);
                assert!(demand >= 5 && demand <= 25);
                assert!(vnr.links_of(node).count() > 0);
            }
        }

        // Same seed, same requests
        let a = generator.generate(0, &mut StdRng::seed_from_u64(3)).unwrap();
        let b = generator.generate(0, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(a, b);
    }
}
