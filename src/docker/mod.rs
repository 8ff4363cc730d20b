//! Docker utilities.
//!
//! Every `docker` subprocess the tool spawns goes through [`DockerClient`]
//! so timeouts and error mapping live in one place.

pub mod client;
pub mod error;

pub use client::DockerClient;
pub use error::DockerError;
