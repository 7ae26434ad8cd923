pub mod cluster;
pub mod config;
pub mod engine;
pub mod image;
pub mod scan;
pub mod severity;

pub use kubevet_common::Result;
