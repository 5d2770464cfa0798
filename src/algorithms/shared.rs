use std::sync::{Mutex, MutexGuard};

use log::debug;

use crate::error::EmbedError;
use crate::models::network::Network;
use crate::models::request::VirtualNetworkRequest;
use crate::operators::mapping::{GreedyMapping, Plan};
use crate::operators::solution::EmbeddingResult;

struct State {
    network: Network,
    version: u64,
}

/**
 * A substrate shared between threads. Attempts plan against a snapshot taken
 * under the lock and only commit if no other commit landed since; otherwise
 * they plan again. Commits therefore look as if requests were embedded one
 * at a time.
 **/
pub struct SharedSubstrate {
    state: Mutex<State>,
}

impl SharedSubstrate {
    pub fn new(network: Network) -> SharedSubstrate {
        SharedSubstrate {
            state: Mutex::new(State {
                network,
                version: 0,
            }),
        }
    }

    /// A consistent copy of the network and the number of commits it has seen.
    pub fn snapshot(&self) -> (Network, u64) {
        let state = self.lock();
        (state.network.clone(), state.version)
    }

    pub fn version(&self) -> u64 {
        self.lock().version
    }

    pub fn embed(
        &self,
        mapping: &GreedyMapping,
        request: &VirtualNetworkRequest,
    ) -> Result<EmbeddingResult, EmbedError> {
        loop {
            let (network, version) = self.snapshot();
            let plan = mapping.plan(&network, request)?;

            match self.commit_if_current(plan, version)? {
                Some(result) => return Ok(result),
                None => debug!(
                    "Substrate changed while planning request {}, planning again",
                    request.id()
                ),
            }
        }
    }

    /// Commits `plan` if the substrate is still at `version`. The version only
    /// moves once an accepted plan has been merged.
    fn commit_if_current(
        &self,
        plan: Plan,
        version: u64,
    ) -> Result<Option<EmbeddingResult>, EmbedError> {
        let mut state = self.lock();
        if state.version != version {
            return Ok(None);
        }

        let changes = matches!(plan, Plan::Accepted { .. });
        let result = plan.commit(&mut state.network)?;
        if changes {
            state.version += 1;
        }

        Ok(Some(result))
    }

    pub fn into_inner(self) -> Network {
        match self.state.into_inner() {
            Ok(state) => state.network,
            Err(poisoned) => poisoned.into_inner().network,
        }
    }

    // Residuals only change through an atomic restore, so a poisoned lock
    // still guards a consistent network
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ----- Unit tests ---- //
#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::path_finder::PathSearch;
    use crate::operators::ranking::Algorithm;
    use rayon::prelude::*;

    #[test]
    fn test_sequential_matches_batch() {
        let network = Network::substrate(vec![10, 10, 10], &[(0, 1, 10), (1, 2, 10)]).unwrap();
        let shared = SharedSubstrate::new(network.clone());
        let mapping = GreedyMapping::from_algorithm(Algorithm::FirstFit, 0, PathSearch::Bfs);

        let vnr = VirtualNetworkRequest::new(0, 2, vec![3, 3], &[(1, 2, 7)]).unwrap();
        let result = shared.embed(&mapping, &vnr).unwrap();

        assert!(result.is_accepted());
        assert_eq!(shared.version(), 1);

        let vnr = VirtualNetworkRequest::new(1, 1, vec![50], &[]).unwrap();
        assert!(shared.embed(&mapping, &vnr).unwrap().is_rejected());
        assert_eq!(shared.version(), 1);

        let network = shared.into_inner();
        assert_eq!(network.residual_of_link(0, 1).unwrap(), 3);
        assert_eq!(network.total_node_residual(), 24);
    }

    #[test]
    fn test_concurrent_commits() {
        let capacities = vec![40; 6];
        let links = [(0, 1, 30), (1, 2, 30), (2, 3, 30), (3, 4, 30), (4, 5, 30), (5, 0, 30)];
        let shared = SharedSubstrate::new(Network::substrate(capacities, &links).unwrap());
        let mapping = GreedyMapping::from_algorithm(Algorithm::WorstFit, 0, PathSearch::Bfs);

        let requests: Vec<_> = (0..40)
            .map(|id| VirtualNetworkRequest::new(id, 2, vec![3, 4], &[(1, 2, 2)]).unwrap())
            .collect();

        let results: Vec<_> = requests
            .par_iter()
            .map(|vnr| shared.embed(&mapping, vnr).unwrap())
            .collect();

        let accepted: Vec<_> = results.iter().filter_map(|r| r.embedding()).collect();
        assert!(!accepted.is_empty());
        assert!(accepted.len() < results.len());
        assert_eq!(shared.version(), accepted.len() as u64);

        // Every accepted request is fully accounted for
        let cpu: usize = accepted.iter().map(|e| e.usage.cpu).sum();
        let bandwidth: usize = accepted.iter().map(|e| e.usage.bandwidth).sum();

        let network = shared.into_inner();
        assert_eq!(network.total_node_capacity() - network.total_node_residual(), cpu);
        assert_eq!(network.total_link_capacity() - network.total_link_residual(), bandwidth);
    }
    #[test]
    fn test_failed_commit_keeps_version() {
        let shared = SharedSubstrate::new(Network::substrate(vec![10, 10], &[(0, 1, 10)]).unwrap());
        let mapping = GreedyMapping::from_algorithm(Algorithm::FirstFit, 0, PathSearch::Bfs);
        let vnr = VirtualNetworkRequest::new(0, 2, vec![3, 3], &[(1, 2, 4)]).unwrap();

        // Planned against a substrate of a different shape
        let other = Network::substrate(vec![10, 10, 10], &[(0, 1, 10), (1, 2, 10)]).unwrap();
        let plan = mapping.plan(&other, &vnr).unwrap();

        assert!(shared.commit_if_current(plan, 0).is_err());
        assert_eq!(shared.version(), 0);

        // A stale plan is not committed at all
        let (network, _) = shared.snapshot();
        let plan = mapping.plan(&network, &vnr).unwrap();
        assert_eq!(shared.commit_if_current(plan, 3).unwrap(), None);
        assert_eq!(shared.version(), 0);

        assert!(shared.embed(&mapping, &vnr).unwrap().is_accepted());
        assert_eq!(shared.version(), 1);
    }
}
