//! Core template machinery: types, parameters, graph, ordering, emission.

pub mod config;
pub mod emitter;
pub mod error;
pub mod evaluate;
pub mod graph;
pub mod naming;
pub mod params;
pub mod resolver;
pub mod template;
pub mod types;
