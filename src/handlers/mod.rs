//! Built-in [`crate::handler::Handler`] implementations (spec.md §4.5).
//! Each submodule is independent; none depend on a particular strategy.

pub mod analyser;
pub mod buffer;
pub mod file;
pub mod indenter;
pub mod indexer;
pub mod regex;
pub mod replace;
pub mod shorten;
pub mod stdout;
pub mod unstringify;
