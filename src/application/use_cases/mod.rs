pub mod analytics;
pub mod campus;
pub mod payment;
pub mod plan_catalog;
pub mod subscription;
