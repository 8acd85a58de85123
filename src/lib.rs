//! SMS-approved fax gateway
//!
//! This library provides the core functionality for faxgate: documents
//! submitted through the web form are held until the submitter approves them
//! by text message, then handed to the fax carrier, with carrier status
//! relayed back by SMS.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;
