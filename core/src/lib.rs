//! Synchronous client for a note-taking application's Local REST API.
//!
//! # Overview
//! Reads, writes, inserts into, deletes, searches and opens notes in a local
//! vault through typed method calls instead of hand-built HTTP requests.
//!
//! # Design
//! - `VaultApi` builds `HttpRequest` values and parses `HttpResponse` values
//!   without touching the network (host-does-IO pattern). Each operation is
//!   split into `build_*` and `parse_*`, so the I/O boundary is explicit.
//! - `Transport` executes a request. `UreqTransport` is the blocking network
//!   implementation; closures implement it too, for tests.
//! - `VaultClient` ties the two together with one method per operation,
//!   returning `Result<_, ApiError>` and logging failures via `tracing`.
//! - Headers are built per request; nothing is shared between calls.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;

pub use api::{NoteTarget, VaultApi};
pub use client::VaultClient;
pub use config::{ClientCertPaths, ClientConfig, DEFAULT_BASE_URL};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::{Transport, UreqTransport};
pub use types::{
    Command, CommandList, FileListing, HeadingInsert, InsertPosition, MatchSpan, NoteContent,
    NoteFormat, NoteJson, NoteStat, Period, SearchMatch, SearchQuery, SearchResult,
    SimpleSearchResult, DEFAULT_CONTEXT_LENGTH, DEFAULT_HEADING_BOUNDARY,
};
