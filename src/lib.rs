//! # Storefront API Library
//!
//! This library provides the core functionality for the multi-tenant
//! storefront service, including handlers, models, and server configuration.

pub mod analytics;
pub mod auth;
pub mod commerce;
pub mod config;
pub mod db;
pub mod error;
pub mod formatting;
pub mod handlers;
pub mod models;
pub mod notifications;
pub mod repositories;
pub mod seeds;
pub mod server;
pub mod telemetry;
pub mod validation;
pub use migration;
