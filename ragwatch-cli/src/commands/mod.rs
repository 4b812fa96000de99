pub mod baseline;
pub mod common;
pub mod config;
pub mod drift;
pub mod stats;
pub mod suggest;
