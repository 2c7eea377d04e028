//! Capture pipeline: turns brain dumps, emails and Drive files into scored,
//! ADHD-adapted task candidates.

pub mod capture;
pub mod config;
pub mod error;
pub mod inference;
pub mod pipeline;
pub mod sources;
pub mod store;
