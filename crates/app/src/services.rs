//! Application services: use-case implementations.
//!
//! Each service accepts port implementations through the [`Platform`](crate::platform::Platform)
//! bundle (constructor injection), keeping this layer decoupled from concrete adapters.

pub mod rule_service;
