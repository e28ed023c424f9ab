pub mod api;
pub mod config;
pub mod error;
pub mod esma;
pub mod pipeline;
pub mod s3;
