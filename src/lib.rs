// src/lib.rs - Library root for the Dojo transport client

pub mod cli;
pub mod client;
pub mod events;
pub mod infra;
pub mod models;
pub mod realtime;
pub mod security;
pub mod util;

pub use client::DojoClient;
pub use infra::config::Config;
pub use infra::errors::DojoError;
