//! Contract tests for async_runtime component
//!
//! These tests pin the ordering guarantees every program relies on.

mod ordering_contract;
