//! Stale-while-revalidate cache for JSON resources fetched over HTTP.
//!
//! A [`CacheStore`] keeps the last good payload per key. The [`Orchestrator`]
//! serves from it, revalidates stale entries in the background and retries
//! failed fetches with linear backoff. A [`Subscription`] exposes the result
//! as a [`RequestState`] that a view can render.

pub mod app;
pub mod cache;
pub mod config;
pub mod event;
pub mod fetch;
pub mod query;
pub mod resources;
pub mod ui;

pub use cache::{CacheEntry, CacheStats, CacheStore, FetchPolicy, Freshness};
pub use fetch::{FetchError, Fetcher, HttpFetcher, Orchestrator};
pub use query::{RequestState, StateUpdate, Subscription};
pub use resources::{ProductFilters, Resource};
