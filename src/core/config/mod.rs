pub mod data;
pub mod defaults;
pub mod io;

pub use data::{Config, ServerConfig};
pub use defaults::{ClientSettings, RelaySettings};
pub use io::ConfigError;

#[cfg(test)]
mod tests;
