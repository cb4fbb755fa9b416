//! SNOMED CT ECL Client
//!
//! Async client for resolving Expression Constraint Language queries against a
//! remote terminology server (Snowstorm-compatible `concepts` endpoint).
//!
//! # Examples
//!
//! ```rust,no_run
//! use lexicon_ecl_client::{EclClient, EclClientConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = EclClient::new(EclClientConfig {
//!     base_url: "https://snowstorm.example.org/MAIN".to_string(),
//!     ..EclClientConfig::default()
//! })?;
//! let concepts = client.query("< 73211009").await?;
//! # Ok(())
//! # }
//! ```
//!
pub mod client;
pub mod error;
pub mod models;

pub use client::{EclClient, EclClientConfig};
pub use error::{Error, Result};
pub use models::{ConceptPage, EclConcept, Term};
