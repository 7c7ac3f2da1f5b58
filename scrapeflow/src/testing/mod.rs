//! Testing utilities for scrapeflow pipelines.
//!
//! This module provides:
//! - A mock browser driver serving canned pages
//! - A mock interceptor with canned traffic
//! - Assertions on run outcomes

mod assertions;
mod mocks;

pub use assertions::{assert_run_failed_with, assert_run_succeeded};
pub use mocks::{MockDriver, MockInterceptor};
