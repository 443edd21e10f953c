//! HTTP client used for archive downloads.

mod client;

pub use client::HttpClient;
