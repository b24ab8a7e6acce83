//! Render Graph System
//!
//! A declarative system for defining render passes as a directed acyclic graph (DAG).
//! The graph validates declarations, orders and culls passes, plans transient
//! memory, and replays each pass's work item. The immediate adapter runs the
//! same passes without a graph.

pub mod context;
pub mod executor;
pub mod globals;
pub mod graph;
pub mod immediate;
pub mod pass;
pub mod pool;
pub mod resource;

pub use context::*;
pub use executor::*;
pub use globals::*;
pub use graph::*;
pub use immediate::*;
pub use pass::*;
pub use pool::*;
pub use resource::*;
