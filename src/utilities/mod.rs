pub mod math;
pub mod metrics;
pub mod stopwatch;
