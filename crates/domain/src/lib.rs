// Sutegi - Domain Layer
// Bounded contexts:
// - shared_kernel: re-exported base types, IDs, states and config
// - workers: workload spec model, spec builder, cluster client capability
//   and the latent worker contract

pub mod shared_kernel;
pub mod workers;

pub use shared_kernel::*;
pub use workers::*;
