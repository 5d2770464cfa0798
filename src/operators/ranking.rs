use std::cmp::Ordering;
use std::fmt::{self, Display};
use std::str::FromStr;

use log::warn;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{UnknownName, WeightingError};
use crate::models::attributes::{bandwidth_strength, node_attributes, residual_crb, Criterion};
use crate::models::network::{Network, NodeID};
use crate::operators::weighting::{AhpWeighting, CriteriaWeighting, EntropyWeighting};
use crate::utilities::math::euclidean_distance;

/// Node ids, most preferred first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranking {
    order: Vec<NodeID>,
}

impl Ranking {
    pub fn identity(num_nodes: usize) -> Ranking {
        Ranking {
            order: (0..num_nodes).collect(),
        }
    }

    /// Descending by score, ties by ascending id.
    pub fn from_scores(scores: &[f64]) -> Ranking {
        let mut order: Vec<NodeID> = (0..scores.len()).collect();

        // Stable sort keeps ascending ids among equal scores
        order.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(Ordering::Equal)
        });

        Ranking { order }
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeID> + '_ {
        self.order.iter().copied()
    }

    pub fn as_slice(&self) -> &[NodeID] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Strategies of the same family may be paired in one embedding call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    FirstFit,
    WorstFit,
    Random,
    Nord,
    Nrm,
    Ahp,
    ResourceProduct,
}

/// Orders the nodes of a graph from its current residual state.
pub trait NodeRanking: Send + Sync {
    fn rank(&self, network: &Network) -> Ranking;
    fn family(&self) -> Family;
}

pub fn rank_nodes(network: &Network, strategy: &dyn NodeRanking) -> Ranking {
    strategy.rank(network)
}

#[derive(Debug, Clone, Default)]
pub struct FirstFit {}
impl FirstFit {
    pub fn new() -> FirstFit {
        FirstFit {}
    }
}

impl NodeRanking for FirstFit {
    fn rank(&self, network: &Network) -> Ranking {
        Ranking::identity(network.num_nodes())
    }

    fn family(&self) -> Family {
        Family::FirstFit
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorstFit {}
impl WorstFit {
    pub fn new() -> WorstFit {
        WorstFit {}
    }
}

impl NodeRanking for WorstFit {
    fn rank(&self, network: &Network) -> Ranking {
        Ranking::from_scores(&residual_crb(network))
    }

    fn family(&self) -> Family {
        Family::WorstFit
    }
}

/// A shuffle that only depends on the seed and the node count.
#[derive(Debug, Clone)]
pub struct RandomOrder {
    seed: u64,
}

impl RandomOrder {
    pub fn new(seed: u64) -> RandomOrder {
        RandomOrder { seed }
    }
}

impl NodeRanking for RandomOrder {
    fn rank(&self, network: &Network) -> Ranking {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut order: Vec<NodeID> = (0..network.num_nodes()).collect();
        order.shuffle(&mut rng);

        Ranking { order }
    }

    fn family(&self) -> Family {
        Family::Random
    }
}

/**
 * TOPSIS closeness over a subset of the normalised node attributes. The
 * weighting source is swappable; everything else is shared by every
 * multi-criteria strategy.
 **/
pub struct Topsis {
    family: Family,
    criteria: Vec<Criterion>,
    weighting: Box<dyn CriteriaWeighting>,
}

impl Topsis {
    /// Fails if `weighting` only weights a fixed number of criteria and that
    /// number is not `criteria.len()`.
    pub fn new(
        family: Family,
        criteria: Vec<Criterion>,
        weighting: Box<dyn CriteriaWeighting>,
    ) -> Result<Topsis, WeightingError> {
        match weighting.num_criteria() {
            Some(weights) if weights != criteria.len() => Err(WeightingError::CriteriaMismatch {
                criteria: criteria.len(),
                weights,
            }),
            _ => Ok(Topsis {
                family,
                criteria,
                weighting,
            }),
        }
    }

    /// Entropy weights over all five criteria.
    pub fn nord() -> Topsis {
        Topsis {
            family: Family::Nord,
            criteria: Criterion::ALL.to_vec(),
            weighting: Box::new(EntropyWeighting::new()),
        }
    }

    /// Entropy weights over the two resource criteria.
    pub fn nrm() -> Topsis {
        Topsis {
            family: Family::Nrm,
            criteria: vec![Criterion::Crb, Criterion::BandwidthStrength],
            weighting: Box::new(EntropyWeighting::new()),
        }
    }

    pub fn ahp() -> Topsis {
        Topsis {
            family: Family::Ahp,
            criteria: vec![Criterion::Crb, Criterion::BandwidthStrength],
            weighting: Box::new(AhpWeighting::crb_vs_bandwidth()),
        }
    }

    pub fn criteria(&self) -> &Vec<Criterion> {
        &self.criteria
    }

    /// Closeness of every node, in node order.
    pub fn scores(&self, network: &Network) -> Vec<f64> {
        let matrix = node_attributes(network).select(&self.criteria);
        let mut weights = self.weighting.weights(&matrix);

        if weights.len() != self.criteria.len() {
            warn!(
                "Got {} weights for {} criteria, weighting them equally",
                weights.len(),
                self.criteria.len()
            );
            weights = vec![1.0 / self.criteria.len() as f64; self.criteria.len()];
        }

        topsis_closeness(&matrix, &weights)
    }
}

impl NodeRanking for Topsis {
    fn rank(&self, network: &Network) -> Ranking {
        Ranking::from_scores(&self.scores(network))
    }

    fn family(&self) -> Family {
        self.family
    }
}

/// Relative closeness to the ideal node, in [0, 1]. Nodes equally far from
/// the best and the worst (both zero) score 0.
pub fn topsis_closeness(matrix: &[Vec<f64>], weights: &[f64]) -> Vec<f64> {
    let weighted: Vec<Vec<f64>> = matrix
        .iter()
        .map(|row| row.iter().zip(weights).map(|(x, w)| x * w).collect())
        .collect();

    let num_criteria = weights.len();
    let mut ideal = vec![std::f64::MIN; num_criteria];
    let mut anti_ideal = vec![std::f64::MAX; num_criteria];

    for row in &weighted {
        for ((best, worst), &x) in ideal.iter_mut().zip(anti_ideal.iter_mut()).zip(row) {
            *best = best.max(x);
            *worst = worst.min(x);
        }
    }

    weighted
        .iter()
        .map(|row| {
            let d_best = euclidean_distance(row, &ideal);
            let d_worst = euclidean_distance(row, &anti_ideal);

            if d_best + d_worst == 0.0 {
                0.0
            } else {
                d_worst / (d_best + d_worst)
            }
        })
        .collect()
}

/// Ranks by residual CRB times bandwidth strength.
#[derive(Debug, Clone, Default)]
pub struct ResourceProduct {}
impl ResourceProduct {
    pub fn new() -> ResourceProduct {
        ResourceProduct {}
    }
}

impl NodeRanking for ResourceProduct {
    fn rank(&self, network: &Network) -> Ranking {
        let scores: Vec<f64> = residual_crb(network)
            .iter()
            .zip(bandwidth_strength(network))
            .map(|(crb, strength)| 2.0 * crb * strength)
            .collect();

        Ranking::from_scores(&scores)
    }

    fn family(&self) -> Family {
        Family::ResourceProduct
    }
}

/// Named pairs of substrate and virtual ranking strategies.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    FirstFit,
    WorstFit,
    Random,
    Nord,
    Nrm,
    Ahp,
    ResourceProduct,
}

impl Algorithm {
    /// `seed` only affects the random strategy.
    pub fn strategies(&self, seed: u64) -> (Box<dyn NodeRanking>, Box<dyn NodeRanking>) {
        match self {
            Algorithm::FirstFit => (Box::new(FirstFit::new()), Box::new(FirstFit::new())),
            Algorithm::WorstFit => (Box::new(WorstFit::new()), Box::new(WorstFit::new())),
            Algorithm::Random => (
                Box::new(RandomOrder::new(seed)),
                Box::new(RandomOrder::new(seed.wrapping_add(1))),
            ),
            Algorithm::Nord => (Box::new(Topsis::nord()), Box::new(Topsis::nord())),
            Algorithm::Nrm => (Box::new(Topsis::nrm()), Box::new(Topsis::nrm())),
            Algorithm::Ahp => (Box::new(Topsis::ahp()), Box::new(Topsis::ahp())),
            Algorithm::ResourceProduct => (
                Box::new(ResourceProduct::new()),
                Box::new(ResourceProduct::new()),
            ),
        }
    }
}

impl Algorithm {
    pub const ALL: [Algorithm; 7] = [
        Algorithm::FirstFit,
        Algorithm::WorstFit,
        Algorithm::Random,
        Algorithm::Nord,
        Algorithm::Nrm,
        Algorithm::Ahp,
        Algorithm::ResourceProduct,
    ];
}

impl FromStr for Algorithm {
    type Err = UnknownName;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .iter()
            .find(|algorithm| algorithm.to_string() == name)
            .copied()
            .ok_or_else(|| UnknownName {
                kind: "algorithm",
                name: name.to_string(),
            })
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Algorithm::FirstFit => "first-fit",
            Algorithm::WorstFit => "worst-fit",
            Algorithm::Random => "random",
            Algorithm::Nord => "nord",
            Algorithm::Nrm => "nrm",
            Algorithm::Ahp => "ahp",
            Algorithm::ResourceProduct => "resource-product",
        };

        write!(f, "{}", name)
    }
}

// ----- Unit tests ---- //
#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn substrate() -> Network {
        // Hub 1 with the most links and capacity
        Network::substrate(
            vec![5, 20, 15, 10],
            &[(0, 1, 10), (1, 2, 30), (1, 3, 20), (2, 3, 5)],
        )
        .unwrap()
    }

    #[test]
    fn test_from_scores() {
        let ranking = Ranking::from_scores(&[0.2, 0.9, 0.2, 0.5]);
        assert_eq!(ranking.as_slice(), &[1, 3, 0, 2]);
        assert_eq!(ranking.len(), 4);

        assert_eq!(Ranking::from_scores(&[]).len(), 0);
        assert_eq!(Ranking::identity(3).iter().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_first_fit() {
        let ranking = rank_nodes(&substrate(), &FirstFit::new());
        assert_eq!(ranking.as_slice(), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_worst_fit() {
        let net = Network::substrate(vec![5, 20, 15], &[(0, 1, 1), (1, 2, 1)]).unwrap();
        let ranking = rank_nodes(&net, &WorstFit::new());

        // Node with CRB 20 before node 0
        assert_eq!(ranking.as_slice(), &[1, 2, 0]);

        // Ties by ascending id
        let tied = Network::substrate(vec![7, 9, 7, 9], &[]).unwrap();
        assert_eq!(rank_nodes(&tied, &WorstFit::new()).as_slice(), &[1, 3, 0, 2]);
    }

    #[test]
    fn test_worst_fit_follows_residuals() {
        let mut net = Network::substrate(vec![5, 20, 15], &[]).unwrap();
        net.apply_node_delta(1, -18).unwrap();

        assert_eq!(rank_nodes(&net, &WorstFit::new()).as_slice(), &[2, 0, 1]);
    }

    #[test]
    fn test_random_is_seeded() {
        let net = Network::substrate(vec![1; 20], &[]).unwrap();

        let a = rank_nodes(&net, &RandomOrder::new(5));
        let b = rank_nodes(&net, &RandomOrder::new(5));
        assert_eq!(a, b);

        let mut sorted = a.as_slice().to_vec();
        sorted.sort();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_topsis_closeness() {
        let matrix = vec![vec![1.0, 1.0], vec![0.0, 0.0], vec![0.5, 0.5]];
        let closeness = topsis_closeness(&matrix, &[0.5, 0.5]);

        assert_abs_diff_eq!(closeness[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(closeness[1], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(closeness[2], 0.5, epsilon = 1e-12);

        // Every node identical
        let same = topsis_closeness(&[vec![0.3], vec![0.3]], &[1.0]);
        assert_eq!(same, vec![0.0, 0.0]);
    }

    #[test]
    fn test_mcdm_prefers_hub() {
        let net = substrate();

        for strategy in &[Topsis::nord(), Topsis::nrm(), Topsis::ahp()] {
            let ranking = rank_nodes(&net, strategy);
            assert_eq!(ranking.as_slice()[0], 1);
            assert_eq!(ranking.len(), 4);
        }

        assert_eq!(rank_nodes(&net, &ResourceProduct::new()).as_slice()[0], 1);
    }

    struct FixedWeights(Vec<f64>);

    impl CriteriaWeighting for FixedWeights {
        fn weights(&self, _matrix: &[Vec<f64>]) -> Vec<f64> {
            self.0.clone()
        }
    }

    #[test]
    fn test_weighting_must_fit_criteria() {
        let uniform = || AhpWeighting::new(&vec![vec![1.0; 3]; 3]).unwrap();
        let resources = vec![Criterion::Crb, Criterion::BandwidthStrength];

        assert_eq!(
            Topsis::new(Family::Ahp, resources.clone(), Box::new(uniform())).err(),
            Some(WeightingError::CriteriaMismatch {
                criteria: 2,
                weights: 3
            })
        );

        let three = vec![Criterion::Crb, Criterion::BandwidthStrength, Criterion::Degree];
        let strategy = Topsis::new(Family::Ahp, three, Box::new(uniform())).unwrap();
        assert_eq!(rank_nodes(&substrate(), &strategy).as_slice()[0], 1);

        // A source that gets the count wrong at ranking time is weighted evenly
        let short = Topsis::new(Family::Nrm, resources.clone(), Box::new(FixedWeights(vec![1.0])))
            .unwrap();
        let even = Topsis::new(
            Family::Nrm,
            resources,
            Box::new(FixedWeights(vec![0.5, 0.5])),
        )
        .unwrap();
        assert_eq!(short.scores(&substrate()), even.scores(&substrate()));
    }

    #[test]
    fn test_ranking_is_idempotent() {
        let net = substrate();

        for algorithm in Algorithm::ALL.iter() {
            let (substrate_rank, virtual_rank) = algorithm.strategies(9);
            assert_eq!(substrate_rank.family(), virtual_rank.family());
            assert_eq!(substrate_rank.rank(&net), substrate_rank.rank(&net));
        }
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!(Algorithm::ResourceProduct.to_string(), "resource-product");
        assert_eq!(Algorithm::FirstFit.to_string(), "first-fit");

        for algorithm in Algorithm::ALL.iter() {
            assert_eq!(algorithm.to_string().parse::<Algorithm>(), Ok(*algorithm));
        }
        assert!("best-fit".parse::<Algorithm>().is_err());
    }
}
