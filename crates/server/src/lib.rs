//! HTTP prediction server for the insurance charges model

pub mod api;
pub mod config;
