//! Rail liveboard and route planner server.
//!
//! Records stream in from a provider in arbitrary order and are kept in a
//! single sorted, de-duplicated list per view. Live corrections replace
//! records in place and may move them.

pub mod config;
pub mod domain;
pub mod models;
pub mod provider;
pub mod stations;
pub mod stream;
pub mod web;
