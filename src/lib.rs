pub mod environment;
pub mod error;
pub mod monitor;
pub mod starter;
