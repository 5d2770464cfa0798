use crate::error::WeightingError;

/// Total divergence below this means no column discriminates.
const MIN_DIVERGENCE: f64 = 1.0e-12;

/// Turns a decision matrix (one row per node, one column per criterion)
/// into a weight per column. Weights sum to one.
pub trait CriteriaWeighting: Send + Sync {
    fn weights(&self, matrix: &[Vec<f64>]) -> Vec<f64>;

    /// The only number of criteria this source can weight, if it is fixed.
    fn num_criteria(&self) -> Option<usize> {
        None
    }
}

/**
 * Objective weights from Shannon entropy: a column whose values are spread
 * evenly across nodes carries no information and gets weight zero.
 **/
#[derive(Debug, Clone, Default)]
pub struct EntropyWeighting {}

impl EntropyWeighting {
    pub fn new() -> EntropyWeighting {
        EntropyWeighting {}
    }
}

impl CriteriaWeighting for EntropyWeighting {
    fn weights(&self, matrix: &[Vec<f64>]) -> Vec<f64> {
        let num_criteria = matrix.first().map_or(0, |row| row.len());
        if num_criteria == 0 {
            return Vec::new();
        }

        let divergence: Vec<f64> = (0..num_criteria)
            .map(|j| {
                let column: Vec<f64> = matrix.iter().map(|row| row[j]).collect();
                (1.0 - column_entropy(&column)).max(0.0)
            })
            .collect();

        let total: f64 = divergence.iter().sum();

        // Nothing discriminates, so nothing is preferred
        if total < MIN_DIVERGENCE {
            return vec![1.0 / num_criteria as f64; num_criteria];
        }

        divergence.iter().map(|d| d / total).collect()
    }
}

/// Normalised Shannon entropy of a column in [0, 1]. Degenerate columns (all
/// zero, or a single node) have entropy 1.
pub fn column_entropy(column: &[f64]) -> f64 {
    let n = column.len();
    let sum: f64 = column.iter().sum();

    if n <= 1 || sum <= 0.0 {
        return 1.0;
    }

    let entropy: f64 = column
        .iter()
        .map(|&x| x / sum)
        .filter(|&p| p > 0.0)
        .map(|p| p * p.ln())
        .sum();

    -entropy / (n as f64).ln()
}

/**
 * Subjective weights from a pairwise comparison matrix, where entry (i, j)
 * states how much more important criterion i is than criterion j. Each
 * column is normalised and the rows are averaged.
 **/
#[derive(Debug, Clone)]
pub struct AhpWeighting {
    priorities: Vec<f64>,
}

impl AhpWeighting {
    pub fn new(comparisons: &[Vec<f64>]) -> Result<AhpWeighting, WeightingError> {
        let n = comparisons.len();
        if n == 0 || comparisons.iter().any(|row| row.len() != n) {
            return Err(WeightingError::NotSquare);
        }

        for (i, row) in comparisons.iter().enumerate() {
            for (j, &value) in row.iter().enumerate() {
                if !(value > 0.0) {
                    return Err(WeightingError::NonPositive(i, j));
                }
            }
        }

        let column_sums: Vec<f64> = (0..n)
            .map(|j| comparisons.iter().map(|row| row[j]).sum())
            .collect();

        let priorities = comparisons
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&column_sums)
                    .map(|(value, sum)| value / sum)
                    .sum::<f64>()
                    / n as f64
            })
            .collect();

        Ok(AhpWeighting { priorities })
    }

    /// CRB against bandwidth strength, bandwidth strongly preferred.
    pub fn crb_vs_bandwidth() -> AhpWeighting {
        AhpWeighting {
            priorities: vec![0.1, 0.9],
        }
    }

    pub fn priorities(&self) -> &Vec<f64> {
        &self.priorities
    }
}

impl CriteriaWeighting for AhpWeighting {
    fn weights(&self, _matrix: &[Vec<f64>]) -> Vec<f64> {
        self.priorities.clone()
    }

    fn num_criteria(&self) -> Option<usize> {
        Some(self.priorities.len())
    }
}
