pub mod algorithms;
pub mod error;
pub mod models;
pub mod operators;
pub mod utilities;

pub use models::network::Network;
pub use models::request::VirtualNetworkRequest;
pub use operators::mapping::embed;
pub use operators::path_finder::find_path;
pub use operators::ranking::rank_nodes;
pub use operators::solution::EmbeddingResult;
