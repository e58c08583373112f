pub mod classify;
pub mod runner;
pub mod validate;

pub use runner::EnrichmentJob;
