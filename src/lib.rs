pub mod artifacts;
pub mod config;
pub mod filter;
pub mod graph;
pub mod metamodel;
pub mod prune;
pub mod query;
pub mod reports;
pub mod types;

#[cfg(test)]
mod fixtures;
