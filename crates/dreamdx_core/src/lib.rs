//! Core data types for the DreamDX narrative service.
//!
//! This crate provides the narrative data model, the JSON shapes exchanged
//! with the narrative endpoint, and logging setup shared by every binary.

mod command;
mod context;
mod entry;
mod observability;
mod record;
mod reply;
mod request;
mod role;

pub use command::{Command, DEFAULT_SESSION_ID, DreamCommand, DreamRequest};
pub use context::RequestContext;
pub use entry::Entry;
pub use observability::{
    DEFAULT_OTLP_ENDPOINT, LogFormat, MetricsExporter, init_metrics, init_tracing,
    record_operation,
};
pub use record::{DATE_FORMAT, NarrativeDocument, NarrativeKey, NarrativeRecord};
pub use reply::{Acknowledgement, DreamReply, ErrorBody};
pub use request::{GenerateRequest, GenerateRequestBuilder, GenerateResponse, Message};
pub use role::Role;
