//! Stateless HTTP request builder and response parser for the vault API.
//!
//! # Design
//! `VaultApi` holds only the base URL and bearer token and carries no mutable
//! state between calls. Each operation is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. Every request gets its own freshly built header list.
//!
//! The note operations (get, append, replace, delete, insert) exist for three
//! addressing modes, captured by `NoteTarget`: the active note, a file by
//! vault path, and a periodic note.

use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    CommandList, FileListing, HeadingInsert, NoteContent, NoteFormat, Period, SearchQuery,
    SearchResult, SimpleSearchResult,
};

const ACCEPT_ANY: &str = "*/*";
const ACCEPT_JSON: &str = "application/json";
const MARKDOWN: &str = "text/markdown";

/// Which note a note operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteTarget<'a> {
    /// Whatever note is currently open in the host application.
    Active,
    /// A file addressed by vault-relative path. Sent as-is.
    File(&'a str),
    /// The current periodic note of the given period.
    Periodic(Period),
}

/// Synchronous, stateless request builder and response parser.
#[derive(Debug, Clone)]
pub struct VaultApi {
    base_url: String,
    token: String,
}

impl VaultApi {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(&config.base_url, &config.token)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -- Note operations ---------------------------------------------------

    pub fn build_get_content(&self, target: NoteTarget<'_>, format: NoteFormat) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: self.note_url(target),
            headers: self.headers(format.accept()),
            body: None,
        }
    }

    /// Append to the end of the note. For a vault file this is the
    /// append-if-absent `PUT`, which creates the file when it is missing.
    pub fn build_append(&self, target: NoteTarget<'_>, content: &str) -> HttpRequest {
        let method = match target {
            NoteTarget::File(_) => HttpMethod::Put,
            NoteTarget::Active | NoteTarget::Periodic(_) => HttpMethod::Post,
        };
        self.write_request(method, target, ACCEPT_ANY, content)
    }

    /// Replace the note's content. For a vault file this is create-or-update.
    pub fn build_replace(&self, target: NoteTarget<'_>, content: &str) -> HttpRequest {
        match target {
            NoteTarget::Active => self.write_request(HttpMethod::Post, target, MARKDOWN, content),
            NoteTarget::File(_) | NoteTarget::Periodic(_) => {
                self.write_request(HttpMethod::Put, target, ACCEPT_ANY, content)
            }
        }
    }

    pub fn build_delete(&self, target: NoteTarget<'_>) -> HttpRequest {
        let accept = match target {
            NoteTarget::Active => MARKDOWN,
            NoteTarget::File(_) | NoteTarget::Periodic(_) => ACCEPT_ANY,
        };
        HttpRequest {
            method: HttpMethod::Delete,
            path: self.note_url(target),
            headers: self.headers(accept),
            body: None,
        }
    }

    /// Insert `content` relative to a heading inside the note.
    ///
    /// `Heading-Boundary` is only sent when `insert.boundary` is set; the
    /// service then splits `Heading` on it instead of `::`.
    pub fn build_insert(
        &self,
        target: NoteTarget<'_>,
        content: &str,
        insert: &HeadingInsert,
    ) -> HttpRequest {
        let mut headers = self.headers(ACCEPT_ANY);
        headers.push(("Heading".to_string(), insert.heading.clone()));
        headers.push((
            "Content-Insertion-Position".to_string(),
            insert.position.as_str().to_string(),
        ));
        headers.push(("Content-Type".to_string(), MARKDOWN.to_string()));
        if let Some(boundary) = &insert.boundary {
            headers.push(("Heading-Boundary".to_string(), boundary.clone()));
        }
        HttpRequest {
            method: HttpMethod::Patch,
            path: self.note_url(target),
            headers,
            body: non_empty(content),
        }
    }

    // -- Vault directories -------------------------------------------------

    /// List the immediate children of `dir`. An empty `dir` lists the vault
    /// root. Empty directories are omitted by the service.
    pub fn build_list_files(&self, dir: &str) -> HttpRequest {
        let path = if dir.is_empty() || dir.ends_with('/') {
            format!("{}/vault/{dir}", self.base_url)
        } else {
            format!("{}/vault/{dir}/", self.base_url)
        };
        HttpRequest {
            method: HttpMethod::Get,
            path,
            headers: self.headers(ACCEPT_JSON),
            body: None,
        }
    }

    // -- Commands ----------------------------------------------------------

    pub fn build_list_commands(&self) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: format!("{}/commands/", self.base_url),
            headers: self.headers(ACCEPT_JSON),
            body: None,
        }
    }

    pub fn build_run_command(&self, command_id: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Post,
            path: format!("{}/commands/{command_id}", self.base_url),
            headers: self.headers(ACCEPT_ANY),
            body: None,
        }
    }

    // -- Search ------------------------------------------------------------

    pub fn build_search(&self, query: &SearchQuery) -> Result<HttpRequest, ApiError> {
        let body = match query {
            SearchQuery::Dql(text) => text.clone(),
            SearchQuery::JsonLogic(logic) => serde_json::to_string(logic)
                .map_err(|e| ApiError::SerializationError(e.to_string()))?,
        };
        let mut headers = self.headers(ACCEPT_JSON);
        headers.push(("Content-Type".to_string(), query.content_type().to_string()));
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: format!("{}/search/", self.base_url),
            headers,
            body: non_empty(&body),
        })
    }

    pub fn build_simple_search(&self, query: &str, context_length: usize) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Post,
            path: format!("{}/search/{query}&contextLength={context_length}", self.base_url),
            headers: self.headers(ACCEPT_JSON),
            body: None,
        }
    }

    /// Search through the host's own search panel, which opens as a side
    /// effect of the call.
    pub fn build_gui_search(&self, query: &str, context_length: usize) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Post,
            path: format!(
                "{}/search/gui/?{query}&contextLength={context_length}",
                self.base_url
            ),
            headers: self.headers(ACCEPT_JSON),
            body: None,
        }
    }

    // -- Open --------------------------------------------------------------

    pub fn build_open_file(&self, path: &str, new_leaf: bool) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Post,
            path: format!("{}/open/{path}?newLeaf={new_leaf}", self.base_url),
            headers: self.headers(ACCEPT_JSON),
            body: None,
        }
    }

    // -- Parsers -----------------------------------------------------------

    pub fn parse_content(
        &self,
        response: HttpResponse,
        format: NoteFormat,
    ) -> Result<NoteContent, ApiError> {
        check_status(&response, 200)?;
        match format {
            NoteFormat::Markdown => Ok(NoteContent::Markdown(response.body)),
            NoteFormat::Json => decode(&response.body).map(NoteContent::Json),
        }
    }

    /// Accept any 2xx for operations that return nothing.
    pub fn parse_no_content(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_success(&response)
    }

    pub fn parse_file_listing(&self, response: HttpResponse) -> Result<FileListing, ApiError> {
        parse_json(response)
    }

    pub fn parse_command_list(&self, response: HttpResponse) -> Result<CommandList, ApiError> {
        parse_json(response)
    }

    pub fn parse_search(&self, response: HttpResponse) -> Result<Vec<SearchResult>, ApiError> {
        parse_json(response)
    }

    pub fn parse_simple_search(
        &self,
        response: HttpResponse,
    ) -> Result<Vec<SimpleSearchResult>, ApiError> {
        parse_json(response)
    }

    // -- Helpers -----------------------------------------------------------

    fn headers(&self, accept: &str) -> Vec<(String, String)> {
        vec![
            ("accept".to_string(), accept.to_string()),
            ("Authorization".to_string(), format!("Bearer {}", self.token)),
        ]
    }

    fn note_url(&self, target: NoteTarget<'_>) -> String {
        match target {
            NoteTarget::Active => format!("{}/active/", self.base_url),
            NoteTarget::File(path) => format!("{}/vault/{path}", self.base_url),
            NoteTarget::Periodic(period) => format!("{}/periodic/{period}/", self.base_url),
        }
    }

    fn write_request(
        &self,
        method: HttpMethod,
        target: NoteTarget<'_>,
        accept: &str,
        content: &str,
    ) -> HttpRequest {
        let mut headers = self.headers(accept);
        let body = non_empty(content);
        if body.is_some() {
            headers.push(("Content-Type".to_string(), MARKDOWN.to_string()));
        }
        HttpRequest {
            method,
            path: self.note_url(target),
            headers,
            body,
        }
    }
}

fn non_empty(content: &str) -> Option<String> {
    (!content.is_empty()).then(|| content.to_string())
}

fn parse_json<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    check_status(&response, 200)?;
    decode(&response.body)
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse, expected: u16) -> Result<(), ApiError> {
    if response.status == expected {
        return Ok(());
    }
    Err(status_error(response))
}

fn check_success(response: &HttpResponse) -> Result<(), ApiError> {
    if (200..300).contains(&response.status) {
        return Ok(());
    }
    Err(status_error(response))
}

fn status_error(response: &HttpResponse) -> ApiError {
    match response.status {
        404 => ApiError::NotFound,
        401 | 403 => ApiError::Unauthorized {
            status: response.status,
        },
        status => ApiError::HttpError {
            status,
            body: response.body.clone(),
        },
    }
}
