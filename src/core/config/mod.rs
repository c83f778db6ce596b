pub mod data;
pub mod defaults;
pub mod io;
pub mod printing;

pub use data::{ChatConfig, Config};
pub use defaults::ConfigOverrides;
pub use io::ConfigError;

#[cfg(test)]
pub mod tests;
