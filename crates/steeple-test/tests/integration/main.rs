#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end tests over local HTTP fixtures.
//!
//! Each test starts its own `mockito` server, so they run in parallel
//! without shared state.

mod calendar;
mod content;
