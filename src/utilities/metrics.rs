use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::network::{Network, ResidualView};
use crate::operators::solution::EmbeddingResult;
use crate::utilities::math::round_to;

pub fn mean(x: &Vec<f64>) -> f64 {
    if x.is_empty() {
        return 0.0;
    }

    x.iter().sum::<f64>() / x.len() as f64
}

/// Summary of one batch of requests against one substrate.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RunMetrics {
    pub num_requests: usize,
    pub num_accepted: usize,
    pub acceptance_ratio: f64,
    pub revenue: usize,
    pub cost: usize,
    pub revenue_to_cost: f64,
    pub node_residual_before: usize,
    pub node_residual_after: usize,
    pub link_residual_before: usize,
    pub link_residual_after: usize,
    pub nodes_used: usize,
    pub links_used: usize,
    pub node_utilisation: f64,
    pub link_utilisation: f64,
    pub execution_time: f64,
}

impl RunMetrics {
    /// `before` and `after` are the substrate either side of the batch.
    pub fn collect(
        before: &Network,
        after: &Network,
        results: &[EmbeddingResult],
        execution_time: Duration,
    ) -> RunMetrics {
        let accepted: Vec<_> = results.iter().filter_map(|r| r.embedding()).collect();

        let revenue = accepted.iter().map(|e| e.usage.revenue).sum();
        let cost = accepted.iter().map(|e| e.usage.cost()).sum();

        let nodes_used: BTreeSet<_> = accepted.iter().flat_map(|e| e.substrate_nodes()).collect();
        let links_used: BTreeSet<_> = accepted.iter().flat_map(|e| e.substrate_links()).collect();

        let node_utilisation: Vec<f64> = (0..after.num_nodes())
            .filter(|&n| after.node(n).capacity > 0)
            .map(|n| {
                let capacity = after.node(n).capacity as f64;
                (capacity - after.node_residual(n) as f64) / capacity
            })
            .collect();

        let link_utilisation: Vec<f64> = (0..after.num_links())
            .filter(|&l| after.link(l).capacity > 0)
            .map(|l| {
                let capacity = after.link(l).capacity as f64;
                (capacity - after.link_residual(l) as f64) / capacity
            })
            .collect();

        RunMetrics {
            num_requests: results.len(),
            num_accepted: accepted.len(),
            acceptance_ratio: ratio(accepted.len(), results.len()),
            revenue,
            cost,
            revenue_to_cost: ratio(revenue, cost),
            node_residual_before: before.total_node_residual(),
            node_residual_after: after.total_node_residual(),
            link_residual_before: before.total_link_residual(),
            link_residual_after: after.total_link_residual(),
            nodes_used: nodes_used.len(),
            links_used: links_used.len(),
            node_utilisation: mean(&node_utilisation),
            link_utilisation: mean(&link_utilisation),
            execution_time: execution_time.as_secs_f64(),
        }
    }

    pub fn csv_header() -> &'static str {
        "num_requests,num_accepted,acceptance_ratio,revenue,cost,revenue_to_cost,\
         node_residual_before,node_residual_after,link_residual_before,link_residual_after,\
         nodes_used,links_used,node_utilisation,link_utilisation,execution_time"
    }

    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            self.num_requests,
            self.num_accepted,
            round_to(self.acceptance_ratio, 4),
            self.revenue,
            self.cost,
            round_to(self.revenue_to_cost, 4),
            self.node_residual_before,
            self.node_residual_after,
            self.link_residual_before,
            self.link_residual_after,
            self.nodes_used,
            self.links_used,
            round_to(self.node_utilisation, 4),
            round_to(self.link_utilisation, 4),
            round_to(self.execution_time, 6),
        )
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

// ----- Unit tests ---- //
#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::request::VirtualNetworkRequest;
    use crate::operators::mapping::embed;
    use crate::operators::ranking::FirstFit;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&vec![1.0, 2.0, 3.0, 6.0]), 3.0);
        assert_eq!(mean(&vec![]), 0.0);
    }

    #[test]
    fn test_collect() {
        let before = Network::substrate(vec![10, 10, 20], &[(0, 1, 10), (1, 2, 10)]).unwrap();
        let mut after = before.clone();

        let requests = vec![
            VirtualNetworkRequest::new(0, 2, vec![5, 5], &[(1, 2, 4)]).unwrap(),
            VirtualNetworkRequest::new(1, 1, vec![30], &[]).unwrap(),
        ];
        let results: Vec<_> = requests
            .iter()
            .map(|r| embed(&mut after, r, &FirstFit::new(), &FirstFit::new()).unwrap())
            .collect();

        let metrics = RunMetrics::collect(&before, &after, &results, Duration::from_millis(250));

        assert_eq!(metrics.num_requests, 2);
        assert_eq!(metrics.num_accepted, 1);
        assert_abs_diff_eq!(metrics.acceptance_ratio, 0.5);
        assert_eq!(metrics.revenue, 14);
        assert_eq!(metrics.cost, 14);
        assert_abs_diff_eq!(metrics.revenue_to_cost, 1.0);
        assert_eq!(metrics.node_residual_before, 40);
        assert_eq!(metrics.node_residual_after, 30);
        assert_eq!(metrics.link_residual_after, 16);
        assert_eq!(metrics.nodes_used, 2);
        assert_eq!(metrics.links_used, 1);
        assert_abs_diff_eq!(metrics.node_utilisation, (0.5 + 0.5 + 0.0) / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(metrics.link_utilisation, 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(metrics.execution_time, 0.25, epsilon = 1e-12);

        let row = metrics.to_csv_row();
        assert_eq!(row.split(',').count(), RunMetrics::csv_header().split(',').count());
        assert!(row.starts_with("2,1,0.5,14,14,1,"));
    }
}
