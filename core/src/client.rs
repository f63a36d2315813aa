//! Executing client: one method per remote operation.
//!
//! # Design
//! `VaultClient` pairs a `VaultApi` (request building, response parsing) with
//! a `Transport` (network round-trip). Each method builds a request with its
//! own header list, sends it, parses the response and logs the outcome. Every
//! failure comes back as an `Err(ApiError)` and is also logged at `error`
//! level.
//!
//! No state is mutated between calls, so a client whose transport is `Sync`
//! can be shared across threads.

use crate::api::{NoteTarget, VaultApi};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::{
    CommandList, FileListing, HeadingInsert, NoteContent, NoteFormat, Period, SearchQuery,
    SearchResult, SimpleSearchResult,
};

/// Client for the note application's Local REST API.
///
/// ```no_run
/// use vault_core::{ClientConfig, VaultClient};
///
/// let config = ClientConfig::new("https://127.0.0.1:27124/", "my-api-key");
/// let client = VaultClient::new(&config)?;
/// client.append_to_active("\n- picked up milk")?;
/// # Ok::<(), vault_core::ApiError>(())
/// ```
pub struct VaultClient<T = UreqTransport> {
    api: VaultApi,
    transport: T,
}

impl VaultClient<UreqTransport> {
    /// Build a client that talks to the configured server over `ureq`.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let transport = UreqTransport::new(config)?;
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> VaultClient<T> {
    pub fn with_transport(config: &ClientConfig, transport: T) -> Result<Self, ApiError> {
        config.parsed_base_url()?;
        Ok(Self {
            api: VaultApi::from_config(config),
            transport,
        })
    }

    pub fn api(&self) -> &VaultApi {
        &self.api
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send one request and return the raw response, whatever its status.
    pub fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        tracing::debug!(method = %request.method, path = %request.path, "sending request");
        self.transport.execute(request)
    }

    // -- Active note -------------------------------------------------------

    /// Markdown content of the note currently open in the application.
    pub fn get_active_content(&self) -> Result<String, ApiError> {
        let request = self.api.build_get_content(NoteTarget::Active, NoteFormat::Markdown);
        self.run("get active content", request, |api, response| {
            api.parse_content(response, NoteFormat::Markdown)
                .map(NoteContent::into_text)
        })
    }

    pub fn append_to_active(&self, content: &str) -> Result<(), ApiError> {
        let request = self.api.build_append(NoteTarget::Active, content);
        self.run("append to active", request, VaultApi::parse_no_content)
    }

    pub fn replace_active_content(&self, content: &str) -> Result<(), ApiError> {
        let request = self.api.build_replace(NoteTarget::Active, content);
        self.run("replace active content", request, VaultApi::parse_no_content)
    }

    pub fn delete_active(&self) -> Result<(), ApiError> {
        let request = self.api.build_delete(NoteTarget::Active);
        self.run("delete active", request, VaultApi::parse_no_content)
    }

    pub fn insert_into_active(&self, content: &str, insert: &HeadingInsert) -> Result<(), ApiError> {
        self.insert_into("insert into active", NoteTarget::Active, content, insert)
    }

    // -- Vault files -------------------------------------------------------

    /// Content of a vault file, as markdown or as a structured `NoteJson`.
    pub fn get_file_content(&self, path: &str, format: NoteFormat) -> Result<NoteContent, ApiError> {
        let request = self.api.build_get_content(NoteTarget::File(path), format);
        self.run("get file content", request, |api, response| {
            api.parse_content(response, format)
        })
    }

    /// Create `path` with `content`, or overwrite it if it already exists.
    pub fn create_or_update_file(&self, path: &str, content: &str) -> Result<(), ApiError> {
        let request = self.api.build_replace(NoteTarget::File(path), content);
        self.run("create or update file", request, VaultApi::parse_no_content)
    }

    /// Append `content` to `path`, creating the file first if it is absent.
    pub fn append_to_file(&self, path: &str, content: &str) -> Result<(), ApiError> {
        let request = self.api.build_append(NoteTarget::File(path), content);
        self.run("append to file", request, VaultApi::parse_no_content)
    }

    pub fn delete_file(&self, path: &str) -> Result<(), ApiError> {
        let request = self.api.build_delete(NoteTarget::File(path));
        self.run("delete file", request, VaultApi::parse_no_content)
    }

    pub fn insert_into_file(
        &self,
        path: &str,
        content: &str,
        insert: &HeadingInsert,
    ) -> Result<(), ApiError> {
        self.insert_into("insert into file", NoteTarget::File(path), content, insert)
    }

    pub fn list_files(&self, dir: &str) -> Result<FileListing, ApiError> {
        let request = self.api.build_list_files(dir);
        self.run("list files", request, VaultApi::parse_file_listing)
    }

    // -- Periodic notes ----------------------------------------------------

    pub fn get_periodic_content(&self, period: Period) -> Result<String, ApiError> {
        let request = self
            .api
            .build_get_content(NoteTarget::Periodic(period), NoteFormat::Markdown);
        self.run("get periodic content", request, |api, response| {
            api.parse_content(response, NoteFormat::Markdown)
                .map(NoteContent::into_text)
        })
    }

    pub fn append_to_periodic(&self, period: Period, content: &str) -> Result<(), ApiError> {
        let request = self.api.build_append(NoteTarget::Periodic(period), content);
        self.run("append to periodic", request, VaultApi::parse_no_content)
    }

    pub fn replace_periodic_content(&self, period: Period, content: &str) -> Result<(), ApiError> {
        let request = self.api.build_replace(NoteTarget::Periodic(period), content);
        self.run("replace periodic content", request, VaultApi::parse_no_content)
    }

    pub fn delete_periodic(&self, period: Period) -> Result<(), ApiError> {
        let request = self.api.build_delete(NoteTarget::Periodic(period));
        self.run("delete periodic", request, VaultApi::parse_no_content)
    }

    pub fn insert_into_periodic(
        &self,
        period: Period,
        content: &str,
        insert: &HeadingInsert,
    ) -> Result<(), ApiError> {
        self.insert_into("insert into periodic", NoteTarget::Periodic(period), content, insert)
    }

    // -- Commands ----------------------------------------------------------

    pub fn list_commands(&self) -> Result<CommandList, ApiError> {
        let request = self.api.build_list_commands();
        self.run("list commands", request, VaultApi::parse_command_list)
    }

    pub fn run_command(&self, command_id: &str) -> Result<(), ApiError> {
        let request = self.api.build_run_command(command_id);
        self.run("run command", request, VaultApi::parse_no_content)
    }

    // -- Search ------------------------------------------------------------

    pub fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, ApiError> {
        let request = self.api.build_search(query).inspect_err(|e| {
            tracing::error!(operation = "search", error = %e, "could not build request");
        })?;
        self.run("search", request, VaultApi::parse_search)
    }

    /// Text search across the vault with `context_length` characters of
    /// context around each match.
    ///
    /// `query` is placed in the URL path unencoded. A `#` starts the URL
    /// fragment and cuts the query short; pass it as `%23` instead.
    pub fn simple_search(
        &self,
        query: &str,
        context_length: usize,
    ) -> Result<Vec<SimpleSearchResult>, ApiError> {
        let request = self.api.build_simple_search(query, context_length);
        self.run("simple search", request, VaultApi::parse_simple_search)
    }

    /// Search through the application's search panel. The panel opens in the
    /// UI as a side effect.
    ///
    /// `query` is placed in the URL query string unencoded. A `#` starts the
    /// URL fragment and cuts the query short; pass it as `%23` instead.
    pub fn gui_search(
        &self,
        query: &str,
        context_length: usize,
    ) -> Result<Vec<SimpleSearchResult>, ApiError> {
        let request = self.api.build_gui_search(query, context_length);
        self.run("gui search", request, VaultApi::parse_simple_search)
    }

    // -- Open --------------------------------------------------------------

    /// Open `path` in the application, creating the note if it does not exist.
    pub fn open_file(&self, path: &str, new_leaf: bool) -> Result<(), ApiError> {
        let request = self.api.build_open_file(path, new_leaf);
        self.run("open file", request, VaultApi::parse_no_content)
    }

    fn insert_into(
        &self,
        operation: &'static str,
        target: NoteTarget<'_>,
        content: &str,
        insert: &HeadingInsert,
    ) -> Result<(), ApiError> {
        tracing::debug!(
            operation,
            heading = ?insert.heading_path(),
            position = %insert.position,
            "inserting relative to heading"
        );
        let request = self.api.build_insert(target, content, insert);
        self.run(operation, request, VaultApi::parse_no_content)
    }

    fn run<R>(
        &self,
        operation: &'static str,
        request: HttpRequest,
        parse: impl FnOnce(&VaultApi, HttpResponse) -> Result<R, ApiError>,
    ) -> Result<R, ApiError> {
        let result = self
            .send(&request)
            .and_then(|response| parse(&self.api, response));
        match &result {
            Ok(_) => tracing::info!(operation, path = %request.path, "request succeeded"),
            Err(e) => tracing::error!(operation, path = %request.path, error = %e, "request failed"),
        }
        result
    }
}
