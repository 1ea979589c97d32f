mod registry;

pub use registry::{all_commands, find_command, CommandInvocation};

use std::path::Path;

use crate::core::app::App;
use crate::core::export::{write_export, ExportFormat};

#[derive(Debug, PartialEq)]
pub enum CommandResult {
    Continue,
    /// A line of feedback for the user.
    Notice(String),
    ProcessAsMessage(String),
    /// A request was issued and its reply should be rendered.
    StreamStarted,
    ShowTranscript,
    ShowHistory,
    Quit,
}

pub fn process_input(app: &mut App, input: &str) -> CommandResult {
    let trimmed = input.trim();

    if !trimmed.starts_with('/') {
        return CommandResult::ProcessAsMessage(input.to_string());
    }

    let mut parts = trimmed[1..].splitn(2, char::is_whitespace);
    let command_name = match parts.next() {
        Some(name) if !name.is_empty() => name,
        _ => return CommandResult::ProcessAsMessage(input.to_string()),
    };
    let args = parts.next().unwrap_or("").trim();

    match find_command(command_name) {
        Some(command) => {
            (command.handler)(app, CommandInvocation { args })
        }
        None => CommandResult::Notice(format!(
            "Unknown command /{command_name}. Type /help for a list."
        )),
    }
}

pub fn help_text() -> String {
    let width = all_commands()
        .iter()
        .map(|command| command.usage.len())
        .max()
        .unwrap_or(0);

    let mut help = String::from("Type a message to talk to your coach. Commands:\n");
    for command in all_commands() {
        help.push_str(&format!("  {:width$}  {}\n", command.usage, command.help));
    }
    help.push_str("Press Ctrl+C to stop a reply that is still streaming.");
    help
}

/// Resolves a 1-based transcript position to a message id.
fn message_id_at(app: &App, position: &str) -> Result<String, String> {
    let index: usize = position
        .parse()
        .map_err(|_| format!("'{position}' is not a message number."))?;
    index
        .checked_sub(1)
        .and_then(|i| app.messages().get(i))
        .map(|msg| msg.id.clone())
        .ok_or_else(|| {
            format!(
                "No message {index}; the conversation has {} message(s).",
                app.messages().len()
            )
        })
}

pub(super) fn handle_help(_app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::Notice(help_text())
}

pub(super) fn handle_regenerate(
    app: &mut App,
    _invocation: CommandInvocation<'_>,
) -> CommandResult {
    if app.is_pending() {
        return CommandResult::Notice("Wait for the current reply to finish.".to_string());
    }
    match app.regenerate() {
        Some(_) => CommandResult::StreamStarted,
        None => CommandResult::Notice(
            "Nothing to regenerate: the conversation must end with a reply.".to_string(),
        ),
    }
}

pub(super) fn handle_edit(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let mut parts = invocation.args.splitn(2, char::is_whitespace);
    let (Some(position), Some(text)) = (parts.next().filter(|p| !p.is_empty()), parts.next())
    else {
        return CommandResult::Notice("Usage: /edit <n> <text>".to_string());
    };

    let id = match message_id_at(app, position) {
        Ok(id) => id,
        Err(message) => return CommandResult::Notice(message),
    };
    if app.edit_message(&id, text) {
        CommandResult::Notice(format!("Edited message {position}."))
    } else {
        CommandResult::Notice("Usage: /edit <n> <text>".to_string())
    }
}

pub(super) fn handle_delete(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        return CommandResult::Notice("Usage: /delete <n>".to_string());
    }
    let id = match message_id_at(app, invocation.args) {
        Ok(id) => id,
        Err(message) => return CommandResult::Notice(message),
    };

    let before = app.messages().len();
    app.delete_message(&id);
    let removed = before - app.messages().len();
    CommandResult::Notice(format!("Deleted {removed} message(s)."))
}

pub(super) fn handle_list(_app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::ShowTranscript
}

pub(super) fn handle_new(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    app.new_conversation();
    CommandResult::Notice(format!(
        "Started conversation {}.",
        app.current_conversation().short_id()
    ))
}

pub(super) fn handle_clear(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    app.clear_conversation();
    CommandResult::Notice("Conversation cleared.".to_string())
}

pub(super) fn handle_history(_app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::ShowHistory
}

pub(super) fn handle_load(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        return CommandResult::Notice("Usage: /load <id>".to_string());
    }
    if app.load_conversation(invocation.args) {
        CommandResult::ShowTranscript
    } else {
        CommandResult::Notice(format!(
            "No saved conversation matches '{}'.",
            invocation.args
        ))
    }
}

pub(super) fn handle_export(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let mut parts = invocation.args.splitn(2, char::is_whitespace);
    let format = match parts.next().filter(|p| !p.is_empty()) {
        Some(name) => match name.parse::<ExportFormat>() {
            Ok(format) => format,
            Err(message) => return CommandResult::Notice(message),
        },
        None => return CommandResult::Notice("Usage: /export <json|md|txt> [path]".to_string()),
    };
    let target = parts
        .next()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(".");

    if app.current_conversation().is_empty() {
        return CommandResult::Notice("Nothing to export yet.".to_string());
    }

    match write_export(app.current_conversation(), format, Path::new(target)) {
        Ok(path) => CommandResult::Notice(format!("Exported to {}", path.display())),
        Err(err) => CommandResult::Notice(format!("Export error: {err}")),
    }
}

pub(super) fn handle_quit(_app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::Quit
}
