// ===============================
// src/lib.rs
// ===============================
pub mod analysis;
pub mod config;
pub mod domain;
pub mod feed;
pub mod metrics;
pub mod positions;
pub mod posttrade;
pub mod recorder;
pub mod report;
pub mod risk;
pub mod stats;
