//! Lashaz storefront library.
//!
//! The persistent cart store and its JSON API, exposed as a library so the
//! router can be tested in-process and the CLI can reuse the repositories.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
