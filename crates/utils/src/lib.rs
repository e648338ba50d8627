//! Shared plumbing used across the backend crates.

pub mod fs;
pub mod logging;
pub mod text;
