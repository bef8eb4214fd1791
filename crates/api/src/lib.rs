//! HTTP API: server wiring, identity resolution, role gating and routes.

pub mod app;
pub mod authz;
pub mod config;
pub mod context;
pub mod middleware;
