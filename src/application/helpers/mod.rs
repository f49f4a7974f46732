pub mod billing_math;
