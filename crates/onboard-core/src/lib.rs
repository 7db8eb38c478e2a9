pub mod cascade;
pub mod client;
pub mod config;
pub mod db;
pub mod deliverable;
pub mod document;
pub mod engagement;
pub mod error;
pub mod io;
pub mod migrations;
pub mod paths;
pub mod risk;
pub mod signature;
pub mod stats;
pub mod step;
pub mod storage;
pub mod types;
pub mod upload;
pub mod view;

pub use error::{OnboardError, Result};
