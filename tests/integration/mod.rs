//! Integration test modules

mod recursive_tree;
mod update_staleness;
