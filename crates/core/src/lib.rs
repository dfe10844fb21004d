// Txprop Core - Domain Model, Ports & Propagation Engine
// NO infrastructure dependencies (Hexagonal Architecture)

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
