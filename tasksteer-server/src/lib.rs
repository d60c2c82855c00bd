//! `TaskSteer` server library.
//!
//! Exposes the HTTP server for use in tests and embedding. The server turns
//! uploaded meeting transcripts into tasks with a generative model and
//! serves personal and shared task lists behind bearer-token auth.

pub mod ai;
pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod gemini;
pub mod handlers;
pub mod server;
pub mod store;
