pub mod common;
pub mod coordinates;
pub mod edge_weight;
pub mod features;
pub mod input;
pub mod metrics;
pub mod pipeline;
pub mod scope;
pub mod simulate;
pub mod spatial_graph;
pub mod topic_model;
