pub mod attributes;
pub mod network;
pub mod request;
pub mod topology;
