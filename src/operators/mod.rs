pub mod path_finder;
pub mod ranking;
pub mod solution;
pub mod weighting;

pub mod mapping;
