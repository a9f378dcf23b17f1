//! govdoc: command-line client for the GovDoc Genie document analysis
//! service, with a local analysis history and dashboard.

pub mod analytics;
pub mod api;
pub mod cli;
pub mod config;
pub mod history;
pub mod records;
pub mod upload;
pub mod web;
