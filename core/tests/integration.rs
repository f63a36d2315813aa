//! End-to-end test against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then exercises every client
//! operation over real HTTP through `UreqTransport`. Validates that request
//! building, transport and response parsing agree with the server, and
//! inspects the server's vault directly to confirm side effects.

use std::sync::Arc;

use mock_server::{Opened, SharedVault, Vault};
use serde_json::json;
use tokio::sync::RwLock;
use vault_core::{
    ApiError, ClientConfig, HeadingInsert, InsertPosition, NoteContent, NoteFormat, Period,
    SearchQuery, VaultClient,
};

const TOKEN: &str = "integration-token";

/// Start the mock server on a random port and return its base URL.
fn start_server(vault: SharedVault) -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, mock_server::router(TOKEN, vault)).await
        })
        .unwrap();
    });

    format!("http://{addr}/")
}

fn seeded() -> SharedVault {
    Arc::new(RwLock::new(
        Vault::new()
            .with_file("inbox.md", "# Inbox\n\n## Today\n- one\n\n## Later\n- two\n")
            .with_file("notes/rust.md", "---\nlang: rust\n---\nownership and #borrowing\n")
            .with_file("notes/go.md", "goroutines\n")
            .with_active("inbox.md"),
    ))
}

#[test]
fn vault_lifecycle() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    // Step 1: start mock server with a seeded vault.
    let vault = seeded();
    let base_url = start_server(vault.clone());
    let client = VaultClient::new(&ClientConfig::new(&base_url, TOKEN)).unwrap();

    // Step 2: read the active note.
    let content = client.get_active_content().unwrap();
    assert!(content.starts_with("# Inbox"));

    // Step 3: append to it and insert under a nested heading.
    client.append_to_active("- three\n").unwrap();
    let insert = HeadingInsert::new("Inbox::Today", InsertPosition::Beginning);
    client.insert_into_active("- zero", &insert).unwrap();
    let content = client.get_active_content().unwrap();
    assert!(content.contains("## Today\n- zero\n- one"));
    assert!(content.ends_with("- two\n- three\n"));

    // Step 4: a missing heading surfaces the server's 400.
    let missing = HeadingInsert::new("Nowhere", InsertPosition::End);
    let err = client.insert_into_active("x", &missing).unwrap_err();
    assert!(matches!(err, ApiError::HttpError { status: 400, .. }));

    // Step 5: structured read of a vault file.
    match client.get_file_content("notes/rust.md", NoteFormat::Json).unwrap() {
        NoteContent::Json(note) => {
            assert_eq!(note.path, "notes/rust.md");
            assert_eq!(note.frontmatter["lang"], "rust");
            assert_eq!(note.tags, vec!["borrowing".to_string()]);
        }
        other => panic!("expected structured note, got {other:?}"),
    }

    // Step 6: list directories.
    assert_eq!(client.list_files("").unwrap().files, vec!["inbox.md", "notes/"]);
    assert_eq!(client.list_files("notes").unwrap().files, vec!["go.md", "rust.md"]);
    assert!(client.list_files("missing").unwrap_err().is_not_found());

    // Step 7: create a file whose path needs percent-encoding, read it back.
    client.create_or_update_file("drafts/new idea.md", "# Idea").unwrap();
    let text = client
        .get_file_content("drafts/new idea.md", NoteFormat::Markdown)
        .unwrap();
    assert_eq!(text, NoteContent::Markdown("# Idea".to_string()));

    // Step 8: insert into it with a custom heading boundary.
    let insert = HeadingInsert::new("Idea", InsertPosition::End).with_boundary("|");
    client.insert_into_file("drafts/new idea.md", "details", &insert).unwrap();
    assert_eq!(
        vault.blocking_read().content("drafts/new idea.md"),
        Some("# Idea\ndetails")
    );

    // Step 9: append-if-absent creates a new file.
    client.append_to_file("drafts/other.md", "seed").unwrap();
    assert_eq!(vault.blocking_read().content("drafts/other.md"), Some("seed"));

    // Step 10: delete respects the path; deleting twice is NotFound.
    client.delete_file("drafts/new idea.md").unwrap();
    assert!(client.delete_file("drafts/new idea.md").unwrap_err().is_not_found());
    assert!(vault.blocking_read().content("inbox.md").is_some(), "active note untouched");

    // Step 11: commands.
    let commands = client.list_commands().unwrap();
    assert!(commands.commands.iter().any(|c| c.id == "graph:open"));
    client.run_command("graph:open").unwrap();
    assert!(client.run_command("nope:nothing").unwrap_err().is_not_found());
    assert_eq!(vault.blocking_read().commands_run, vec!["graph:open".to_string()]);

    // Step 12: structured search, both query kinds.
    let logic = json!({"glob": ["notes/*.md", {"var": "path"}]});
    let results = client.search(&SearchQuery::JsonLogic(logic)).unwrap();
    let names: Vec<&str> = results.iter().map(|r| r.filename.as_str()).collect();
    assert_eq!(names, vec!["notes/go.md", "notes/rust.md"]);

    let results = client
        .search(&SearchQuery::Dql("TABLE file.name".to_string()))
        .unwrap();
    assert_eq!(results.len(), 4);

    // Step 13: simple and GUI text search.
    let results = client.simple_search("goroutines", 5).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].filename, "notes/go.md");
    assert_eq!(results[0].matches[0].context, "goroutines\n");

    let results = client.gui_search("ownership", 3).unwrap();
    assert_eq!(results[0].filename, "notes/rust.md");

    // Step 14: open a note that does not exist yet.
    client.open_file("journal/today.md", true).unwrap();
    {
        let vault = vault.blocking_read();
        assert_eq!(vault.active.as_deref(), Some("journal/today.md"));
        assert_eq!(
            vault.opened,
            vec![Opened {
                path: "journal/today.md".to_string(),
                new_leaf: true,
            }]
        );
    }

    // Step 15: periodic notes.
    client.append_to_periodic(Period::Daily, "# Day\n\n## Log\n").unwrap();
    client
        .insert_into_periodic(Period::Daily, "- coffee", &HeadingInsert::new("Day::Log", InsertPosition::End))
        .unwrap();
    assert_eq!(
        client.get_periodic_content(Period::Daily).unwrap(),
        "# Day\n\n## Log\n- coffee\n"
    );
    client.replace_periodic_content(Period::Daily, "# Fresh").unwrap();
    assert_eq!(client.get_periodic_content(Period::Daily).unwrap(), "# Fresh");
    client.delete_periodic(Period::Daily).unwrap();
    assert!(client.get_periodic_content(Period::Daily).unwrap_err().is_not_found());

    // Step 16: delete the active note; reading it is then NotFound.
    client.delete_active().unwrap();
    assert!(client.get_active_content().unwrap_err().is_not_found());

    // Step 17: a wrong token is Unauthorized.
    let intruder = VaultClient::new(&ClientConfig::new(&base_url, "wrong")).unwrap();
    let err = intruder.list_commands().unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized { status: 401 }));
}

#[test]
fn large_note_is_read_in_full() {
    let big = "lorem ipsum dolor sit amet\n".repeat(11 * 1024 * 1024 / 27 + 1);
    assert!(big.len() > 11 * 1024 * 1024);

    let vault = Arc::new(RwLock::new(
        Vault::new().with_file("big.md", &big).with_active("big.md"),
    ));
    let base_url = start_server(vault);
    let client = VaultClient::new(&ClientConfig::new(&base_url, TOKEN)).unwrap();

    let content = client.get_file_content("big.md", NoteFormat::Markdown).unwrap();
    assert_eq!(content.text().len(), big.len());
    assert_eq!(content, NoteContent::Markdown(big.clone()));

    assert_eq!(client.get_active_content().unwrap().len(), big.len());
}

#[test]
fn simple_search_needs_encoded_hash() {
    let base_url = start_server(seeded());
    let client = VaultClient::new(&ClientConfig::new(&base_url, TOKEN)).unwrap();

    let results = client.simple_search("%23borrowing", 5).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].filename, "notes/rust.md");

    // A bare `#` becomes a fragment, so the request lands on `/search/`.
    let err = client.simple_search("#borrowing", 5).unwrap_err();
    assert!(matches!(err, ApiError::HttpError { status: 400, .. }));
}

#[test]
fn unreachable_server_is_a_transport_error() {
    // Bind then drop to get a port with nothing listening.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let client = VaultClient::new(&ClientConfig::new(&format!("http://{addr}/"), TOKEN)).unwrap();
    let err = client.get_active_content().unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}
