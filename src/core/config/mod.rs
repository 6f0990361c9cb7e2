pub mod data;
pub mod io;


pub use data::{path_display, Config, ConfigKeyError, CONFIG_KEYS};
pub use io::ConfigError;
