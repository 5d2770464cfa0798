use log::info;

use crate::error::EmbedError;
use crate::models::network::Network;
use crate::models::request::VirtualNetworkRequest;
use crate::operators::mapping::Mapping;
use crate::operators::solution::EmbeddingResult;

/// Admission priority: cheapest requests first. Equal revenues keep their
/// relative order.
pub fn sort_by_revenue(requests: &mut Vec<VirtualNetworkRequest>) {
    requests.sort_by_key(|request| request.revenue());
}

/**
 * Embeds `requests` one at a time, in the order given, against a single
 * substrate. The observer sees every result as soon as it is committed.
 **/
pub fn run<Map: Mapping>(
    substrate: &mut Network,
    requests: &[VirtualNetworkRequest],
    mapping: &Map,
    mut request_observer: impl FnMut(usize, &EmbeddingResult),
) -> Result<Vec<EmbeddingResult>, EmbedError> {
    let mut results = Vec::with_capacity(requests.len());

    for (i, request) in requests.iter().enumerate() {
        let result = mapping.apply(substrate, request)?;
        request_observer(i, &result);
        results.push(result);
    }

    let accepted = results.iter().filter(|r| r.is_accepted()).count();
    info!("Embedded {} of {} requests", accepted, requests.len());

    Ok(results)
}

// ----- Unit tests ---- //
#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::mapping::GreedyMapping;
    use crate::operators::path_finder::PathSearch;
    use crate::operators::ranking::Algorithm;
    use crate::operators::solution::RejectReason;

    fn requests() -> Vec<VirtualNetworkRequest> {
        vec![
            VirtualNetworkRequest::new(0, 2, vec![8, 8], &[(1, 2, 10)]).unwrap(),
            VirtualNetworkRequest::new(1, 2, vec![1, 1], &[(1, 2, 1)]).unwrap(),
            VirtualNetworkRequest::new(2, 3, vec![1, 1, 1], &[(1, 2, 1), (2, 3, 1)]).unwrap(),
            VirtualNetworkRequest::new(3, 1, vec![6], &[]).unwrap(),
        ]
    }

    #[test]
    fn test_sort_by_revenue() {
        let mut requests = requests();
        sort_by_revenue(&mut requests);

        let order: Vec<_> = requests.iter().map(|r| r.id()).collect();
        assert_eq!(order, vec![1, 2, 3, 0]);
    }

    #[test]
    fn test_run_in_order() {
        let mut substrate = Network::substrate(vec![10, 10, 10], &[(0, 1, 10), (1, 2, 10)]).unwrap();
        let mapping = GreedyMapping::from_algorithm(Algorithm::FirstFit, 0, PathSearch::Bfs);

        let mut seen = Vec::new();
        let results = run(&mut substrate, &requests(), &mapping, |i, result| {
            seen.push((i, result.request()));
        })
        .unwrap();

        assert_eq!(seen, vec![(0, 0), (1, 1), (2, 2), (3, 3)]);
        assert!(results[0].is_accepted());

        // The first request saturated link (0, 1), cutting node 0 off
        assert_eq!(substrate.residual_of_link(0, 1).unwrap(), 0);
        assert_eq!(
            results[1].reason(),
            Some(RejectReason::Unroutable {
                node: 2,
                link: (1, 2)
            })
        );
        assert!(results[2].is_rejected());
        assert_eq!(results[3].embedding().unwrap().host_of(1), Some(2));
    }

    #[test]
    fn test_rejected_requests_keep_going() {
        let mut substrate = Network::substrate(vec![5, 5], &[(0, 1, 2)]).unwrap();
        let mapping = GreedyMapping::from_algorithm(Algorithm::WorstFit, 0, PathSearch::Bfs);

        let requests = vec![
            VirtualNetworkRequest::new(0, 1, vec![9], &[]).unwrap(),
            VirtualNetworkRequest::new(1, 1, vec![3], &[]).unwrap(),
        ];

        let results = run(&mut substrate, &requests, &mapping, |_, _| {}).unwrap();

        assert!(results[0].is_rejected());
        assert!(results[1].is_accepted());
        assert_eq!(substrate.total_node_residual(), 7);
    }
}
