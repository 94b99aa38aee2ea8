pub mod cache;
pub mod case_id;
pub mod client;
pub mod config;
pub mod constants;
pub mod download;
pub mod junit;
pub mod payload;
pub mod rejection;
pub mod results;
pub mod upload;
pub mod utils;
