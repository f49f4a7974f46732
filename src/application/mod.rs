pub mod access;
pub mod app_error;
pub mod entity_locks;
pub mod helpers;
pub mod notice_templates;
pub mod ports;
pub mod use_cases;
pub mod validators;
