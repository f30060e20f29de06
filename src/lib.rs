// Library exports for Plaza
// This allows integration tests and the binary to share the same modules

pub mod auth;
pub mod blobs;
pub mod config;
pub mod content;
pub mod db;
pub mod engagement;
pub mod error;
pub mod extractors;
pub mod forms;
pub mod identity;
pub mod policy;
pub mod routes;
pub mod service;
pub mod state;
