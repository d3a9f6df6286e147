//! # medgraph - THE BINARY (library surface)
//!
//! The mechanical collaborators around `medgraph-core`: tab-delimited
//! snapshot/schedule readers and the clap CLI. Exposed as a library so
//! integration tests can drive the readers directly.

pub mod cli;
pub mod snapshot;
