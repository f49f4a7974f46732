//! Test utilities for unit and route tests.
//!
//! This module provides:
//! - Test data factories for creating valid test fixtures
//! - In-memory repository implementations for mocking persistence
//! - Scripted gateway and recording notifier/invoice/coupon fakes
//! - `TestAppStateBuilder` for HTTP tests

mod app_state_builder;
mod billing_mocks;
mod factories;
mod port_mocks;

pub use app_state_builder::*;
pub use billing_mocks::*;
pub use factories::*;
pub use port_mocks::*;
