mod client;
mod fetch;
mod retry;

pub use client::{SuiteSource, TrackerClient};
pub use fetch::{FetchOrchestrator, FetchStats, SuiteFailure};
pub use retry::RetryPolicy;
