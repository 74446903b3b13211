//! Sprout API Library Crate
//!
//! This library contains all the logic for the sprout web service: application
//! state, configuration, the Postgres store adapters, API handlers, and
//! routing. The `api` binary is a thin wrapper around this library.

pub mod config;
pub mod db;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
