//! Per-source question answering.
//!
//! A [`SourceQueryClient`] assembles bounded context for the files of one
//! bucket or container, asks a model to answer in a fixed three-section
//! grammar, and caches any descriptions the model proposes.

mod client;
mod prompt;
mod response;

pub use client::{QueryError, SourceClient, SourceQueryClient, no_data_found};
pub use prompt::{EMPTY_DESCRIPTION, FileContext, RESPONSE_LAYOUT, UNKNOWN_SCHEMA, build_prompt, sample_text};
pub use response::{ParsedResponse, parse_response};
