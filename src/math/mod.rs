//! Mathematical utilities: inverse links, proximal operators, descriptive stats.

pub mod link;
pub mod prox;
pub mod stats;

pub use link::*;
pub use prox::*;
pub use stats::*;
