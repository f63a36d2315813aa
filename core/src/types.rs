//! Domain DTOs for the vault REST API.
//!
//! # Design
//! Response types mirror the JSON the host application's REST API returns.
//! They are defined independently from the mock-server crate; the
//! end-to-end test catches schema drift between the two.
//!
//! Argument types (`SearchQuery`, `HeadingInsert`, `NoteFormat`, `Period`)
//! replace stringly-typed parameters with explicit variants chosen by the
//! caller.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Delimiter between nested heading names in a `Heading` header.
pub const DEFAULT_HEADING_BOUNDARY: &str = "::";

/// Characters of context returned around each simple-search match.
pub const DEFAULT_CONTEXT_LENGTH: usize = 100;

/// Structured note document returned for `application/vnd.olrapi.note+json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoteJson {
    #[serde(default)]
    pub path: String,
    pub content: String,
    #[serde(default)]
    pub frontmatter: Map<String, Value>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub stat: NoteStat,
}

/// File timestamps (milliseconds since the epoch) and size in bytes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NoteStat {
    pub ctime: u64,
    pub mtime: u64,
    pub size: u64,
}

/// Representation requested from the get-content endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NoteFormat {
    #[default]
    Markdown,
    Json,
}

impl NoteFormat {
    /// Value of the `accept` header that selects this format.
    pub fn accept(&self) -> &'static str {
        match self {
            NoteFormat::Markdown => "text/markdown",
            NoteFormat::Json => "application/vnd.olrapi.note+json",
        }
    }
}

/// Note content, parsed according to the requested `NoteFormat`.
#[derive(Debug, Clone, PartialEq)]
pub enum NoteContent {
    Markdown(String),
    Json(NoteJson),
}

impl NoteContent {
    /// The markdown text, whichever format was requested.
    pub fn text(&self) -> &str {
        match self {
            NoteContent::Markdown(text) => text,
            NoteContent::Json(note) => &note.content,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            NoteContent::Markdown(text) => text,
            NoteContent::Json(note) => note.content,
        }
    }
}

/// Immediate children of a vault directory. Directories end with `/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileListing {
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Command {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandList {
    pub commands: Vec<Command>,
}

/// Query accepted by the structured search endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchQuery {
    /// A Dataview `TABLE` query, sent as text.
    Dql(String),
    /// A JsonLogic expression, sent as JSON. Besides the standard operators
    /// the service understands `glob` and `regexp`.
    JsonLogic(Value),
}

impl SearchQuery {
    pub fn content_type(&self) -> &'static str {
        match self {
            SearchQuery::Dql(_) => "application/vnd.olrapi.dataview.dql+txt",
            SearchQuery::JsonLogic(_) => "application/vnd.olrapi.jsonlogic+json",
        }
    }
}

/// One file matched by a structured search, with the query's value for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub filename: String,
    pub result: Value,
}

/// One file matched by a simple or GUI text search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimpleSearchResult {
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default)]
    pub matches: Vec<SearchMatch>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchMatch {
    #[serde(rename = "match")]
    pub span: MatchSpan,
    pub context: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
}

/// Where inserted content lands relative to the target heading's section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    Beginning,
    End,
}

impl InsertPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsertPosition::Beginning => "beginning",
            InsertPosition::End => "end",
        }
    }
}

impl fmt::Display for InsertPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target of an insert-relative-to-heading call.
///
/// `heading` may name a nested heading path such as `Projects::Rust`. Set
/// `boundary` when a heading itself contains `::`; it is sent verbatim as
/// `Heading-Boundary`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingInsert {
    pub heading: String,
    pub position: InsertPosition,
    pub boundary: Option<String>,
}

impl HeadingInsert {
    pub fn new(heading: impl Into<String>, position: InsertPosition) -> Self {
        Self {
            heading: heading.into(),
            position,
            boundary: None,
        }
    }

    pub fn with_boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = Some(boundary.into());
        self
    }

    /// Separator the service splits `heading` on: the custom boundary if set,
    /// otherwise `DEFAULT_HEADING_BOUNDARY`.
    pub fn heading_boundary(&self) -> &str {
        self.boundary.as_deref().unwrap_or(DEFAULT_HEADING_BOUNDARY)
    }

    /// Heading names from outermost to innermost.
    pub fn heading_path(&self) -> Vec<&str> {
        self.heading.split(self.heading_boundary()).collect()
    }
}

/// Periodic note families exposed under `/periodic/{period}/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
            Period::Quarterly => "quarterly",
            Period::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_json_tolerates_missing_optional_fields() {
        let note: NoteJson = serde_json::from_str(r##"{"content":"# Title"}"##).unwrap();
        assert_eq!(note.content, "# Title");
        assert!(note.frontmatter.is_empty());
        assert!(note.tags.is_empty());
        assert_eq!(note.stat, NoteStat::default());
    }

    #[test]
    fn search_match_reads_match_key() {
        let raw = r#"{"filename":"a.md","score":1.5,"matches":[{"match":{"start":3,"end":8},"context":"a hello b"}]}"#;
        let result: SimpleSearchResult = serde_json::from_str(raw).unwrap();
        assert_eq!(result.matches[0].span, MatchSpan { start: 3, end: 8 });
        assert_eq!(result.score, Some(1.5));
    }

    #[test]
    fn search_query_content_types() {
        assert_eq!(
            SearchQuery::Dql("TABLE file.name".to_string()).content_type(),
            "application/vnd.olrapi.dataview.dql+txt"
        );
        assert_eq!(
            SearchQuery::JsonLogic(serde_json::json!({"glob": ["*.md", {"var": "path"}]})).content_type(),
            "application/vnd.olrapi.jsonlogic+json"
        );
    }

    #[test]
    fn heading_path_uses_default_or_custom_boundary() {
        let nested = HeadingInsert::new("Projects::Rust", InsertPosition::End);
        assert_eq!(nested.heading_boundary(), DEFAULT_HEADING_BOUNDARY);
        assert_eq!(nested.heading_path(), vec!["Projects", "Rust"]);

        let custom = HeadingInsert::new("C++::notes|Setup", InsertPosition::End).with_boundary("|");
        assert_eq!(custom.heading_boundary(), "|");
        assert_eq!(custom.heading_path(), vec!["C++::notes", "Setup"]);
    }

    #[test]
    fn note_content_text_reads_either_format() {
        let json = NoteContent::Json(NoteJson {
            path: "a.md".to_string(),
            content: "body".to_string(),
            frontmatter: Map::new(),
            tags: Vec::new(),
            stat: NoteStat::default(),
        });
        assert_eq!(json.text(), "body");
        assert_eq!(NoteContent::Markdown("md".to_string()).text(), "md");
    }
}
