// src/models/mod.rs - Records exchanged with the backend

pub mod analytics;
pub mod project;
pub mod provider;
pub mod session;
pub mod settings;
pub mod tool;

pub use analytics::*;
pub use project::*;
pub use provider::*;
pub use session::*;
pub use settings::*;
pub use tool::*;

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
