pub mod logging;

pub use logging::LogConfig;
