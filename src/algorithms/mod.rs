pub mod batch;
pub mod shared;
