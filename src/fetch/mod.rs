//! Network fetching with retry, and the orchestration of cache and network.

mod client;
mod error;
mod orchestrator;
#[cfg(test)]
pub(crate) mod testing;

pub use client::{Fetcher, HttpFetcher};
pub use error::FetchError;
pub use orchestrator::{Orchestrator, Publisher};
