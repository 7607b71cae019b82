//! Spa back office: agent accounts, service catalog, clients, and the
//! operation validation workflow feeding revenue reports.

pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod ledger;
pub mod models;
pub mod report;
pub mod routes;
pub mod scope;
pub mod state;
pub mod store;
