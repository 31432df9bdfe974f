//! Infrastructure layer: concrete adapters for the domain ports.

pub mod email;
pub mod repository;
