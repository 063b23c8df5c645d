// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod expa_repository;
pub mod memory_cache;
