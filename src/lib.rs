//! Token-authenticated HTTP front for a churn classifier.

pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod customer;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod predict_handlers;
pub mod prediction;
pub mod user_handlers;

#[cfg(test)]
mod test_support;
