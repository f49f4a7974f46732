pub mod billing_period;
pub mod payment_method;
pub mod payment_scenario;
pub mod payment_status;
pub mod role_level;
pub mod subscription_status;
pub mod usage;
