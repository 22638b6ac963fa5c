//! Shared utilities for sentinel
//!
//! This crate provides common functionality used across the sentinel workspace:
//! tracing subscriber setup and typed access to environment configuration.

pub mod config;
pub mod logging;

pub use config::{EnvError, env_flag, env_parse, env_var};
pub use logging::{LogFormat, init_tracing, init_tracing_with};
