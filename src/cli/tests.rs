use super::*;
use crate::utils::test_utils::conversation_with;
use std::fs;
use tempfile::TempDir;

fn parse_args(argv: &[&str]) -> Args {
    Args::try_parse_from(argv)
        .unwrap_or_else(|err| panic!("argv={argv:?} should parse successfully: {err}"))
}

fn seeded_store() -> (ConversationStore, String) {
    let mut store = ConversationStore::in_memory();
    let conversation = conversation_with(&[
        ("user", "I can't switch off after work."),
        ("assistant", "Try a short shutdown ritual."),
    ]);
    store.save_conversation(&conversation).unwrap();
    store
        .set_current_conversation_id(Some(&conversation.id))
        .unwrap();
    (store, conversation.id)
}

#[test]
fn no_subcommand_means_chat() {
    let args = parse_args(&["mental-coach"]);
    assert!(args.command.is_none());
    assert!(args.api_url.is_none());
}

#[test]
fn global_flags_work_after_subcommand() {
    let argv = [
        "mental-coach",
        "history",
        "--api-url",
        "http://relay:9000/",
        "--data-dir",
        "/tmp/coach",
        "-l",
        "coach.log",
    ];
    let args = parse_args(&argv);

    assert!(matches!(args.command, Some(Commands::History)));
    assert_eq!(args.api_url.as_deref(), Some("http://relay:9000/"));
    assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/coach")));
    assert_eq!(args.log_file, Some(PathBuf::from("coach.log")));
}

#[test]
fn serve_accepts_bind_address() {
    match parse_args(&["mental-coach", "serve", "--bind", "127.0.0.1:9100"]).command {
        Some(Commands::Serve { bind }) => assert_eq!(bind.as_deref(), Some("127.0.0.1:9100")),
        _ => panic!("expected serve subcommand"),
    }
}

#[test]
fn export_defaults_to_markdown_in_current_dir() {
    match parse_args(&["mental-coach", "export", "abc123"]).command {
        Some(Commands::Export { id, format, output }) => {
            assert_eq!(id, "abc123");
            assert_eq!(format, ExportFormat::Markdown);
            assert_eq!(output, PathBuf::from("."));
        }
        _ => panic!("expected export subcommand"),
    }
}

#[test]
fn export_rejects_unknown_format() {
    let result = Args::try_parse_from(["mental-coach", "export", "abc", "--format", "pdf"]);
    assert!(result.is_err());
}

#[test]
fn delete_requires_an_id() {
    assert!(Args::try_parse_from(["mental-coach", "delete"]).is_err());
}

#[test]
fn history_lists_saved_conversations() {
    let (store, id) = seeded_store();
    let listing = list_conversations(&store);
    assert!(listing.starts_with(&format!("* {}", &id[..8])));
    assert!(listing.contains("I can't switch off after work."));

    assert_eq!(
        list_conversations(&ConversationStore::in_memory()),
        "No saved conversations.\n"
    );
}

#[test]
fn export_by_prefix_writes_file() {
    let (store, id) = seeded_store();
    let dir = TempDir::new().unwrap();

    let path = export_conversation(&store, &id[..8], ExportFormat::Json, dir.path()).unwrap();

    assert_eq!(path, dir.path().join(format!("conversation-{}.json", &id[..8])));
    let written = fs::read_to_string(path).unwrap();
    assert!(written.contains("Try a short shutdown ritual."));
}

#[test]
fn export_unknown_conversation_fails() {
    let (store, _id) = seeded_store();
    let dir = TempDir::new().unwrap();

    let err = export_conversation(&store, "zzzz", ExportFormat::Text, dir.path()).unwrap_err();
    assert!(err.to_string().contains("zzzz"));
}

#[test]
fn delete_clears_current_pointer() {
    let (mut store, id) = seeded_store();

    let deleted = delete_conversation(&mut store, &id).unwrap();

    assert_eq!(deleted.id, id);
    assert!(store.conversations().is_empty());
    assert!(store.current_conversation_id().is_none());
    assert!(delete_conversation(&mut store, &id).is_err());
}
