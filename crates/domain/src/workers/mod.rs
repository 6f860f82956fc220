pub mod builder;
pub mod cluster;
pub mod context;
pub mod latent;
pub mod spec;

pub use builder::*;
pub use cluster::*;
pub use context::*;
pub use latent::*;
pub use spec::*;
