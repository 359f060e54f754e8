//! HTTP request handlers
//!
//! - `api` - Health check endpoint
//! - `ingest` - S3 notification webhook running the document-to-speech pipeline
//! - `signer` - Presigned upload/download URLs (router fallback)

pub mod api;
pub mod ingest;
pub mod signer;

pub use ingest::{IngestHandler, IngestReport, S3Event, s3_event_handler};
pub use signer::{UrlSigner, signer_handler};
