// Application layer - use cases and collaborator traits
pub mod analytics_repository;
pub mod dashboard_service;
pub mod response_cache;
