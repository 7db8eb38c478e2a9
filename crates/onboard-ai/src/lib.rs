//! `onboard-ai`: client for the generative-text provider.
//!
//! Two uses: drafting a structured welcome message from a statement of
//! work ([`draft::draft_welcome`]) and streaming free-form project insight
//! ([`AiClient::stream`]).

pub mod client;
pub mod draft;
pub mod error;
pub mod stream;

pub use client::{AiClient, ProviderConfig};
pub use draft::{draft_welcome, parse_draft, WelcomeDraft};
pub use error::AiError;
pub use stream::{InsightBuffer, InsightStream};

pub type Result<T> = std::result::Result<T, AiError>;
