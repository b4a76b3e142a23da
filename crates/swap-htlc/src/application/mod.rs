//! # Application Module
//!
//! Application services orchestrating the swap core and outbound ports.

pub mod service;

pub use service::SwapService;
