//! HTTP transport for catalog and artifact transfers.

mod client;

pub use client::HttpClient;
