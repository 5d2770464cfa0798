use std::fmt::Display;

use thiserror::Error;

use crate::models::network::NodeID;
use crate::models::request::VirtualNodeID;

/// A capacity-bearing element of a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    Node(NodeID),
    Link(NodeID, NodeID),
}

impl Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Element::Node(node) => write!(f, "node {}", node),
            Element::Link(a, b) => write!(f, "link ({}, {})", a, b),
        }
    }
}

/// Errors raised by the graph model.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Node {0} does not exist")]
    UnknownNode(NodeID),
    #[error("There is no link between nodes {0} and {1}")]
    UnknownLink(NodeID, NodeID),
    #[error("The link between nodes {0} and {1} is declared more than once")]
    DuplicateLink(NodeID, NodeID),
    #[error("Node {0} cannot be linked to itself")]
    SelfLoop(NodeID),
    /// The engine miscalculated feasibility. Never expected at runtime.
    #[error("Applying {delta} to {element} (residual {residual}) leaves [0, {capacity}]")]
    CapacityViolation {
        element: Element,
        residual: usize,
        capacity: usize,
        delta: isize,
    },
    #[error("The residual snapshot does not match the shape of this network")]
    SnapshotMismatch,
}

/// A malformed virtual network request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("A request must contain at least one node")]
    Empty,
    #[error("Request declares {declared} nodes but gives {given} cpu demands")]
    NodeCountMismatch { declared: usize, given: usize },
    #[error("Link endpoint {node} is outside the node range 1..={num_nodes}")]
    NodeOutOfRange {
        node: VirtualNodeID,
        num_nodes: usize,
    },
    #[error("Virtual node {0} cannot be linked to itself")]
    SelfLoop(VirtualNodeID),
    #[error("The link between virtual nodes {0} and {1} is declared more than once")]
    DuplicateLink(VirtualNodeID, VirtualNodeID),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("No path is searched between node {0} and itself")]
    SameEndpoints(NodeID),
    #[error("Node {0} does not exist")]
    UnknownNode(NodeID),
    #[error("Path enumeration gave up after {0} expansions")]
    SearchBudgetExhausted(usize),
}

/// Soft failure: callers fall back to `last_iterate`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CentralityError {
    #[error("Eigenvector centrality did not converge within {iterations} iterations")]
    Nonconvergence {
        iterations: usize,
        last_iterate: Vec<f64>,
    },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum WeightingError {
    #[error("Pairwise comparison matrix must be square and non-empty")]
    NotSquare,
    #[error("Pairwise comparison at ({0}, {1}) must be positive")]
    NonPositive(usize, usize),
    #[error("{weights} weights cannot score {criteria} criteria")]
    CriteriaMismatch { criteria: usize, weights: usize },
}

/// Fatal outcomes of an embedding call. A rejection is not one of them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmbedError {
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] RequestError),
    #[error("{0}")]
    Network(#[from] NetworkError),
    #[error("{0}")]
    Path(#[from] PathError),
}

/// A configuration name that matches no known variant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown {kind} '{name}'")]
pub struct UnknownName {
    pub kind: &'static str,
    pub name: String,
}
