//! Chair and estate catalog service with a write-invalidated, multi-tier cache.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
