pub fn round_to(num: f64, num_dp: usize) -> f64 {
    let ten: f64 = 10.0;
    let mult = ten.powf(num_dp as f64);
    (num * mult).round() / mult
}

pub fn euclidean_norm(x: &[f64]) -> f64 {
    x.iter().map(|x| x * x).sum::<f64>().sqrt()
}

// Assumes that the indexes of each slice align
pub fn euclidean_distance(x: &[f64], y: &[f64]) -> f64 {
    x.iter()
        .zip(y)
        .map(|(x, y)| (x - y).powf(2.0))
        .sum::<f64>()
        .sqrt()
}

/// Divides by the Euclidean norm. A zero vector stays zero.
pub fn normalise(x: &[f64]) -> Vec<f64> {
    let norm = euclidean_norm(x);

    if norm == 0.0 {
        return vec![0.0; x.len()];
    }

    x.iter().map(|x| x / norm).collect()
}
