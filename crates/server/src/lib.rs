//! HTTP front end for the PCOS prediction service

pub mod api;
pub mod config;
