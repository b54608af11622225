//! drishti-server: HTTP front-end for drishti object detection

pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod pages;
pub mod startup;
pub mod static_files;
