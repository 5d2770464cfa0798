use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::error::{EmbedError, PathError};
use crate::models::network::{Network, NodeID, Overlay, RequestID, ResidualView, Residuals};
use crate::models::request::{VirtualNetworkRequest, VirtualNodeID};
use crate::operators::path_finder::{Path, PathSearch};
use crate::operators::ranking::{Algorithm, NodeRanking};
use crate::operators::solution::{Embedding, EmbeddingResult, RejectReason, ResourceUsage};

/// Embeds one request into a substrate, committing only on success.
pub trait Mapping {
    fn apply(
        &self,
        substrate: &mut Network,
        request: &VirtualNetworkRequest,
    ) -> Result<EmbeddingResult, EmbedError>;
}

/// Greedy node-then-link mapping driven by a pair of ranking strategies.
pub struct GreedyMapping {
    substrate_ranking: Box<dyn NodeRanking>,
    virtual_ranking: Box<dyn NodeRanking>,
    path_search: PathSearch,
}

impl GreedyMapping {
    pub fn new(
        substrate_ranking: Box<dyn NodeRanking>,
        virtual_ranking: Box<dyn NodeRanking>,
        path_search: PathSearch,
    ) -> GreedyMapping {
        GreedyMapping {
            substrate_ranking,
            virtual_ranking,
            path_search,
        }
    }

    pub fn from_algorithm(algorithm: Algorithm, seed: u64, path_search: PathSearch) -> GreedyMapping {
        let (substrate_ranking, virtual_ranking) = algorithm.strategies(seed);
        GreedyMapping::new(substrate_ranking, virtual_ranking, path_search)
    }

    /// Computes an embedding against `substrate` without touching it.
    pub fn plan(
        &self,
        substrate: &Network,
        request: &VirtualNetworkRequest,
    ) -> Result<Plan, EmbedError> {
        plan_embedding(
            substrate,
            request,
            self.substrate_ranking.as_ref(),
            self.virtual_ranking.as_ref(),
            self.path_search,
        )
    }
}

impl Mapping for GreedyMapping {
    fn apply(
        &self,
        substrate: &mut Network,
        request: &VirtualNetworkRequest,
    ) -> Result<EmbeddingResult, EmbedError> {
        self.plan(substrate, request)?.commit(substrate)
    }
}

/// A finished attempt, not yet merged into the substrate.
#[derive(Debug, Clone)]
pub enum Plan {
    Accepted {
        embedding: Embedding,
        residuals: Residuals,
    },
    Rejected {
        request: RequestID,
        reason: RejectReason,
    },
}

impl Plan {
    /// Merges the residuals of an accepted plan in one step. A rejected plan
    /// leaves the substrate as it was.
    pub fn commit(self, substrate: &mut Network) -> Result<EmbeddingResult, EmbedError> {
        match self {
            Plan::Accepted {
                embedding,
                residuals,
            } => {
                substrate.restore(residuals)?;
                info!(
                    "Accepted request {} (revenue {}, cost {})",
                    embedding.request,
                    embedding.usage.revenue,
                    embedding.usage.cost()
                );

                Ok(EmbeddingResult::Accepted(embedding))
            }
            Plan::Rejected { request, reason } => {
                info!("Rejected request {}: {}", request, reason);

                Ok(EmbeddingResult::Rejected { request, reason })
            }
        }
    }
}

/// Embeds `request` with BFS routing and commits it on success.
pub fn embed(
    substrate: &mut Network,
    request: &VirtualNetworkRequest,
    substrate_ranking: &dyn NodeRanking,
    virtual_ranking: &dyn NodeRanking,
) -> Result<EmbeddingResult, EmbedError> {
    plan_embedding(
        substrate,
        request,
        substrate_ranking,
        virtual_ranking,
        PathSearch::default(),
    )?
    .commit(substrate)
}

/**
 * Ranks both graphs against the committed substrate, then binds virtual nodes
 * in rank order. Each binding routes every link to an already bound
 * neighbour before it is kept; a binding whose links cannot all be routed
 * is undone and the next substrate candidate is tried. The first virtual
 * node with no workable candidate rejects the whole request.
 **/
pub fn plan_embedding(
    substrate: &Network,
    request: &VirtualNetworkRequest,
    substrate_ranking: &dyn NodeRanking,
    virtual_ranking: &dyn NodeRanking,
    path_search: PathSearch,
) -> Result<Plan, EmbedError> {
    request.validate()?;

    if substrate_ranking.family() != virtual_ranking.family() {
        warn!(
            "Ranking families differ: {:?} for the substrate, {:?} for request {}",
            substrate_ranking.family(),
            virtual_ranking.family(),
            request.id()
        );
    }

    // Ranking
    let substrate_order = substrate_ranking.rank(substrate);
    let virtual_order: Vec<VirtualNodeID> = virtual_ranking
        .rank(&request.to_network()?)
        .iter()
        .map(|index| index + 1)
        .collect();

    let mut attempt = EmbeddingAttempt::new(substrate, request, path_search);

    // Node binding
    for &v in &virtual_order {
        let demand = request.cpu_demand(v);
        let mut unroutable = None;
        let mut bound = false;

        for s in substrate_order.iter() {
            if attempt.is_used(s) || attempt.overlay.node_residual(s) <= demand {
                continue;
            }

            match attempt.try_bind(v, s)? {
                Binding::Bound => {
                    debug!("Request {}: bound virtual node {} to {}", request.id(), v, s);
                    bound = true;
                    break;
                }
                Binding::Unroutable(link) => {
                    debug!(
                        "Request {}: virtual node {} on {} cannot route ({}, {})",
                        request.id(),
                        v,
                        s,
                        link.0,
                        link.1
                    );
                    unroutable = Some(link);
                }
            }
        }

        if !bound {
            let reason = match unroutable {
                Some(link) => RejectReason::Unroutable { node: v, link },
                None => RejectReason::NoCandidate { node: v, demand },
            };

            return Ok(Plan::Rejected {
                request: request.id(),
                reason,
            });
        }
    }

    Ok(attempt.finish())
}

enum Binding {
    Bound,
    Unroutable((VirtualNodeID, VirtualNodeID)),
}

/// One speculative change, kept so a failed binding can be undone.
enum Delta {
    Node { node: NodeID, amount: usize },
    Path { key: (VirtualNodeID, VirtualNodeID), amount: usize },
}

struct EmbeddingAttempt<'a> {
    request: &'a VirtualNetworkRequest,
    path_search: PathSearch,
    overlay: Overlay<'a>,
    nodes: BTreeMap<VirtualNodeID, NodeID>,
    links: BTreeMap<(VirtualNodeID, VirtualNodeID), Path>,
    used: Vec<bool>,
    journal: Vec<Delta>,
}

impl<'a> EmbeddingAttempt<'a> {
    fn new(
        substrate: &'a Network,
        request: &'a VirtualNetworkRequest,
        path_search: PathSearch,
    ) -> EmbeddingAttempt<'a> {
        EmbeddingAttempt {
            request,
            path_search,
            overlay: substrate.overlay(),
            nodes: BTreeMap::new(),
            links: BTreeMap::new(),
            used: vec![false; substrate.num_nodes()],
            journal: Vec::new(),
        }
    }

    fn is_used(&self, node: NodeID) -> bool {
        self.used[node]
    }

    /// Binds `v` to `s` and routes its links to bound neighbours, in the
    /// request's link order. All or nothing.
    fn try_bind(&mut self, v: VirtualNodeID, s: NodeID) -> Result<Binding, EmbedError> {
        let checkpoint = self.journal.len();
        let demand = self.request.cpu_demand(v);

        self.overlay.apply_node_delta(s, -(demand as isize))?;
        self.journal.push(Delta::Node {
            node: s,
            amount: demand,
        });
        self.nodes.insert(v, s);
        self.used[s] = true;

        let request = self.request;
        for link in request.links() {
            let u = match link.other(v) {
                Some(u) if self.nodes.contains_key(&u) => u,
                _ => continue,
            };

            let (a, b) = link.endpoints;
            let key = (a.min(b), a.max(b));

            match self.route(self.nodes[&a], self.nodes[&b], link.bandwidth)? {
                Some(path) => {
                    self.overlay
                        .apply_path_delta(&path, -(link.bandwidth as isize))?;
                    self.journal.push(Delta::Path {
                        key,
                        amount: link.bandwidth,
                    });
                    self.links.insert(key, path);
                }
                None => {
                    self.rollback(checkpoint)?;
                    self.nodes.remove(&v);
                    self.used[s] = false;

                    return Ok(Binding::Unroutable((v.min(u), v.max(u))));
                }
            }
        }

        Ok(Binding::Bound)
    }

    fn route(
        &self,
        source: NodeID,
        destination: NodeID,
        bandwidth: usize,
    ) -> Result<Option<Path>, EmbedError> {
        let network = self.overlay.network();

        match self
            .path_search
            .find(network, &self.overlay, source, destination, bandwidth)
        {
            Ok(path) => Ok(path),
            Err(PathError::SearchBudgetExhausted(limit)) => {
                warn!(
                    "Path search from {} to {} gave up after {} expansions",
                    source, destination, limit
                );
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn rollback(&mut self, checkpoint: usize) -> Result<(), EmbedError> {
        while self.journal.len() > checkpoint {
            match self.journal.pop() {
                Some(Delta::Node { node, amount }) => {
                    self.overlay.apply_node_delta(node, amount as isize)?;
                }
                Some(Delta::Path { key, amount }) => {
                    if let Some(path) = self.links.remove(&key) {
                        self.overlay.apply_path_delta(&path, amount as isize)?;
                    }
                }
                None => break,
            }
        }

        Ok(())
    }

    fn finish(self) -> Plan {
        let request = self.request;

        let bandwidth = request
            .links()
            .iter()
            .map(|link| {
                let (a, b) = link.endpoints;
                let hops = self.links.get(&(a.min(b), a.max(b))).map_or(0, |path| path.len() - 1);
                link.bandwidth * hops
            })
            .sum();

        let usage = ResourceUsage {
            cpu: request.total_cpu(),
            bandwidth,
            revenue: request.revenue(),
        };

        Plan::Accepted {
            embedding: Embedding {
                request: request.id(),
                nodes: self.nodes,
                links: self.links,
                usage,
            },
            residuals: self.overlay.into_residuals(),
        }
    }
}
