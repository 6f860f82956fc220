pub mod latent_controller;

pub use latent_controller::*;
