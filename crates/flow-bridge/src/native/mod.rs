//! Native object space exposed through the bridge.

pub mod data;
pub mod env;
pub mod graph;
pub mod node;

pub use data::NodeData;
pub use env::Env;
pub use graph::Graph;
pub use node::{Connection, Node, PortEvent};
