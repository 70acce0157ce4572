pub mod chunk;
pub mod config;
pub mod endpoints;
pub mod fetch;
pub mod observe;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod records;
pub mod trip;
