//! HTTP plumbing: the client seam, its decorators and the batch fetcher.

mod basic;
mod batch;
mod client;
mod request;
mod traced;

pub use basic::BasicClient;
pub use batch::BatchFetcher;
pub use client::HttpClient;
pub use request::{FetchResult, RequestDescriptor, RequestKind, TRANSIENT_STATUS};
pub use traced::Traced;
