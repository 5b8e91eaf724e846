//! Types shared by the plan filter library and its HTTP service: environment
//! driven settings, the error taxonomy, and the request/response DTOs.

pub mod config;
pub mod dto;
pub mod error;
