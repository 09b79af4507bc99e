//! Application layer orchestrating domain logic and infrastructure.

pub mod concat;
pub mod export;
pub mod link;
pub mod scaffold;
pub mod scan;
