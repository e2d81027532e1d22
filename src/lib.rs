//! Turnstile - HTTP Request Admission Layer
//!
//! This crate implements an admission layer for HTTP services: each incoming
//! request is either forwarded to the application handler or rejected by a
//! per-key token-bucket rate limiter, and every outcome is recorded in
//! Prometheus counters by a metrics-recording middleware.

pub mod app;
pub mod config;
pub mod error;
pub mod metrics;
pub mod ratelimit;
