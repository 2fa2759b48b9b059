//! Integration tests for odps-review.

pub mod engine_test;
pub mod live_test;
pub mod pipeline_test;
