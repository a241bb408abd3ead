//! Unit tests for host_modules components
