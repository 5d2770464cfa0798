use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::models::network::{NodeID, RequestID};
use crate::models::request::VirtualNodeID;
use crate::operators::path_finder::Path;

/// Substrate resources held by an accepted request.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResourceUsage {
    pub cpu: usize,
    /// Bandwidth summed over every hop of every path.
    pub bandwidth: usize,
    /// What the tenant asked for: cpu plus bandwidth demands.
    pub revenue: usize,
}

impl ResourceUsage {
    pub fn cost(&self) -> usize {
        self.cpu + self.bandwidth
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Embedding {
    pub request: RequestID,
    pub nodes: BTreeMap<VirtualNodeID, NodeID>,
    /// Keyed by (low, high) virtual endpoints. Paths run from the host of
    /// the first endpoint to the host of the second.
    pub links: BTreeMap<(VirtualNodeID, VirtualNodeID), Path>,
    pub usage: ResourceUsage,
}

impl Embedding {
    pub fn host_of(&self, node: VirtualNodeID) -> Option<NodeID> {
        self.nodes.get(&node).copied()
    }

    pub fn path_of(&self, a: VirtualNodeID, b: VirtualNodeID) -> Option<&Path> {
        self.links.get(&(a.min(b), a.max(b)))
    }

    pub fn substrate_nodes(&self) -> BTreeSet<NodeID> {
        self.nodes.values().copied().collect()
    }

    /// Substrate links on any path, as (low, high) pairs.
    pub fn substrate_links(&self) -> BTreeSet<(NodeID, NodeID)> {
        self.links
            .values()
            .flat_map(|path| path.windows(2).map(|hop| (hop[0].min(hop[1]), hop[0].max(hop[1]))))
            .collect()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No unused substrate node has more CRB than the demand.
    NoCandidate {
        node: VirtualNodeID,
        demand: usize,
    },
    /// Every candidate with enough CRB failed to route this link.
    Unroutable {
        node: VirtualNodeID,
        link: (VirtualNodeID, VirtualNodeID),
    },
}

impl Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NoCandidate { node, demand } => {
                write!(f, "no substrate node can host virtual node {} (demand {})", node, demand)
            }
            RejectReason::Unroutable { node, link } => write!(
                f,
                "virtual node {} could not be bound with link ({}, {}) routed",
                node, link.0, link.1
            ),
        }
    }
}

/// Outcome of embedding one request. Rejection is an ordinary outcome.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingResult {
    Accepted(Embedding),
    Rejected {
        request: RequestID,
        reason: RejectReason,
    },
}

impl EmbeddingResult {
    pub fn is_accepted(&self) -> bool {
        match self {
            EmbeddingResult::Accepted(_) => true,
            _ => false,
        }
    }

    pub fn is_rejected(&self) -> bool {
        !self.is_accepted()
    }

    pub fn request(&self) -> RequestID {
        match self {
            EmbeddingResult::Accepted(embedding) => embedding.request,
            EmbeddingResult::Rejected { request, .. } => *request,
        }
    }

    pub fn embedding(&self) -> Option<&Embedding> {
        match self {
            EmbeddingResult::Accepted(embedding) => Some(embedding),
            _ => None,
        }
    }

    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            EmbeddingResult::Rejected { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

impl Display for EmbeddingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbeddingResult::Accepted(embedding) => write!(
                f,
                "Accepted(request {}, nodes {:?}, revenue {}, cost {})",
                embedding.request,
                embedding.nodes,
                embedding.usage.revenue,
                embedding.usage.cost()
            ),
            EmbeddingResult::Rejected { request, reason } => {
                write!(f, "Rejected(request {}: {})", request, reason)
            }
        }
    }
}
