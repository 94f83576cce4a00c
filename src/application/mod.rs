//! Application services layer.

pub mod catalog;
pub mod chairs;
pub mod error;
pub mod estates;
pub mod ingest;
pub mod maintenance;
pub mod repos;
