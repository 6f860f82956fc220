// Sutegi - Infrastructure Layer
// Concrete cluster client implementations:
// - cluster::kubernetes: kube-rs backed client, one Pod per build
// - cluster::in_memory: scriptable in-process client for tests

pub mod cluster;

pub use cluster::*;
