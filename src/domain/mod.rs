// Domain layer - pure funnel types and transforms
pub mod dashboard;
pub mod error;
pub mod filters;
pub mod funnel;
