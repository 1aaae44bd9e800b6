//! HTTP route handlers

pub mod games;
pub mod status;
