// src/infra/mod.rs - Configuration, errors, logging and paths

pub mod config;
pub mod errors;
pub mod logger;
pub mod paths;
