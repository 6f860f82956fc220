// Sutegi - Application Layer
// Orchestration of latent worker lifecycles over the domain capabilities

pub mod workers;

pub use workers::*;
