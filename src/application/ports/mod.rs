pub mod invoicing;
pub mod notifications;
pub mod payment_gateway;
pub mod pricing;
