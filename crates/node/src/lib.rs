pub mod replica;
pub mod run;
pub mod sync;

pub use run::{start, Node, NodeConfig};
