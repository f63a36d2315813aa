//! In-memory vault backing the mock server.
//!
//! Holds note files by vault-relative path, the active note, the command
//! palette and a record of side effects (commands run, notes opened) so tests
//! can assert on them.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug)]
pub struct NoteFile {
    pub content: String,
    pub ctime: u64,
    pub mtime: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct Command {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Opened {
    pub path: String,
    pub new_leaf: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Position {
    Beginning,
    End,
}

#[derive(Debug, Default)]
pub struct Vault {
    files: BTreeMap<String, NoteFile>,
    pub active: Option<String>,
    pub commands: Vec<Command>,
    pub commands_run: Vec<String>,
    pub opened: Vec<Opened>,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

impl Vault {
    /// A vault with the default command palette and no notes.
    pub fn new() -> Self {
        let commands = [
            ("editor:toggle-bold", "Toggle bold"),
            ("graph:open", "Graph view: Open graph view"),
            ("app:reload", "Reload app without saving"),
        ]
        .into_iter()
        .map(|(id, name)| Command {
            id: id.to_string(),
            name: name.to_string(),
        })
        .collect();
        Self {
            commands,
            ..Self::default()
        }
    }

    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.write(path, content);
        self
    }

    pub fn with_active(mut self, path: &str) -> Self {
        self.active = Some(path.to_string());
        self
    }

    pub fn read(&self, path: &str) -> Option<&NoteFile> {
        self.files.get(path)
    }

    pub fn content(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(|f| f.content.as_str())
    }

    pub fn write(&mut self, path: &str, content: &str) {
        let now = now_millis();
        let ctime = self.files.get(path).map_or(now, |f| f.ctime);
        self.files.insert(
            path.to_string(),
            NoteFile {
                content: content.to_string(),
                ctime,
                mtime: now,
            },
        );
    }

    /// Append to `path`, creating it if absent.
    pub fn append(&mut self, path: &str, content: &str) {
        let mut current = self.content(path).unwrap_or_default().to_string();
        current.push_str(content);
        self.write(path, &current);
    }

    pub fn delete(&mut self, path: &str) -> bool {
        if self.active.as_deref() == Some(path) {
            self.active = None;
        }
        self.files.remove(path).is_some()
    }

    /// Insert relative to the heading path. `None` if the note or heading is
    /// missing.
    pub fn insert(&mut self, path: &str, heading_path: &[&str], position: Position, content: &str) -> Option<()> {
        let updated = insert_under_heading(self.content(path)?, heading_path, position, content)?;
        self.write(path, &updated);
        Some(())
    }

    /// Immediate children of `dir` (`""` for the root). Directories end with
    /// `/`. `None` if `dir` holds no files.
    pub fn list(&self, dir: &str) -> Option<Vec<String>> {
        let prefix = if dir.is_empty() || dir.ends_with('/') {
            dir.to_string()
        } else {
            format!("{dir}/")
        };
        let children: BTreeSet<String> = self
            .files
            .keys()
            .filter_map(|path| path.strip_prefix(prefix.as_str()))
            .map(|rest| match rest.split_once('/') {
                Some((child_dir, _)) => format!("{child_dir}/"),
                None => rest.to_string(),
            })
            .collect();
        if children.is_empty() && !prefix.is_empty() {
            return None;
        }
        Some(children.into_iter().collect())
    }

    pub fn paths(&self) -> impl Iterator<Item = (&String, &NoteFile)> {
        self.files.iter()
    }
}

/// Structured note view served for `application/vnd.olrapi.note+json`.
pub fn note_json(path: &str, file: &NoteFile) -> Value {
    serde_json::json!({
        "path": path,
        "content": file.content,
        "frontmatter": frontmatter(&file.content),
        "tags": tags(&file.content),
        "stat": {
            "ctime": file.ctime,
            "mtime": file.mtime,
            "size": file.content.len(),
        },
    })
}

/// Flat `key: value` pairs from a leading `---` block.
fn frontmatter(content: &str) -> Map<String, Value> {
    let mut map = Map::new();
    let mut lines = content.lines();
    if lines.next() != Some("---") {
        return map;
    }
    for line in lines.take_while(|l| *l != "---") {
        if let Some((key, value)) = line.split_once(':') {
            map.insert(key.trim().to_string(), Value::String(value.trim().to_string()));
        }
    }
    map
}

/// `#tag` words outside headings, without the `#`.
fn tags(content: &str) -> Vec<String> {
    let tags: BTreeSet<String> = content
        .lines()
        .filter(|line| heading(line).is_none())
        .flat_map(str::split_whitespace)
        .filter_map(|word| word.strip_prefix('#'))
        .filter(|tag| !tag.is_empty() && !tag.starts_with('#'))
        .map(str::to_string)
        .collect();
    tags.into_iter().collect()
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if level == 0 {
        return None;
    }
    let title = line[level..].strip_prefix(' ')?;
    Some((level, title.trim()))
}

/// Insert `content` at the beginning or end of the section named by
/// `heading_path` (outermost heading first).
pub fn insert_under_heading(doc: &str, heading_path: &[&str], position: Position, content: &str) -> Option<String> {
    let lines: Vec<&str> = doc.lines().collect();
    let mut stack: Vec<(usize, &str)> = Vec::new();
    let mut found = None;
    for (i, line) in lines.iter().enumerate() {
        let Some((level, title)) = heading(line) else {
            continue;
        };
        while stack.last().is_some_and(|(l, _)| *l >= level) {
            stack.pop();
        }
        stack.push((level, title));
        if stack.iter().map(|(_, t)| *t).eq(heading_path.iter().copied()) {
            found = Some((i, level));
            break;
        }
    }
    let (index, level) = found?;

    let at = match position {
        Position::Beginning => index + 1,
        Position::End => lines[index + 1..]
            .iter()
            .position(|l| heading(l).is_some_and(|(lv, _)| lv <= level))
            .map_or(lines.len(), |offset| index + 1 + offset),
    };

    let mut out: Vec<&str> = Vec::with_capacity(lines.len() + 4);
    out.extend_from_slice(&lines[..at]);
    out.extend(content.lines());
    out.extend_from_slice(&lines[at..]);
    let mut joined = out.join("\n");
    if doc.ends_with('\n') {
        joined.push('\n');
    }
    Some(joined)
}

/// `*` matches any run of characters, `?` exactly one.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(c) if *c == '?' || *c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((bp, bt)) => {
                    p = bp + 1;
                    t = bt + 1;
                    backtrack = Some((bp, bt + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|c| *c == '*')
}

/// Substring matches with up to `context_length` bytes of context on each
/// side, clamped to character boundaries.
pub fn find_matches(content: &str, query: &str, context_length: usize) -> Vec<Value> {
    if query.is_empty() {
        return Vec::new();
    }
    content
        .match_indices(query)
        .map(|(start, m)| {
            let end = start + m.len();
            let mut from = start.saturating_sub(context_length);
            while !content.is_char_boundary(from) {
                from -= 1;
            }
            let mut to = (end + context_length).min(content.len());
            while !content.is_char_boundary(to) {
                to += 1;
            }
            serde_json::json!({
                "match": { "start": start, "end": end },
                "context": &content[from..to],
            })
        })
        .collect()
}
