//! Session-gated content console for job postings and popups.
pub mod config;
pub mod console;
pub mod error;
pub mod filter;
pub mod form;
pub mod gateway;
pub mod model;
pub mod notify;
pub mod session;
pub mod store;
pub mod upload;
pub mod workspace;
