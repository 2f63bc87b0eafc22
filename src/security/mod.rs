// src/security/mod.rs - Client-side safety checks

pub mod tool_policy;
