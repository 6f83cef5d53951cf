//! Release lineage trees
//!
//! Each platform's releases form a tree (every release names the release it
//! was derived from). The crate answers two questions over those trees: the
//! lowest common ancestor of two releases, and the net set of change-items
//! a newer release carries over an older one.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
