use super::CommandResult;
use crate::core::app::App;

pub type CommandHandler = fn(&mut App, CommandInvocation<'_>) -> CommandResult;

pub struct Command {
    pub name: &'static str,
    pub usage: &'static str,
    pub help: &'static str,
    pub handler: CommandHandler,
}

#[derive(Clone, Copy)]
pub struct CommandInvocation<'a> {
    pub args: &'a str,
}

pub fn all_commands() -> &'static [Command] {
    COMMANDS
}

pub fn find_command(name: &str) -> Option<&'static Command> {
    all_commands()
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
        .or_else(|| match name.to_ascii_lowercase().as_str() {
            "exit" | "q" => find_command("quit"),
            "ls" => find_command("list"),
            _ => None,
        })
}

const COMMANDS: &[Command] = &[
    Command {
        name: "help",
        usage: "/help",
        help: "Show available commands.",
        handler: super::handle_help,
    },
    Command {
        name: "regenerate",
        usage: "/regenerate",
        help: "Ask again for a new version of the last reply.",
        handler: super::handle_regenerate,
    },
    Command {
        name: "edit",
        usage: "/edit <n> <text>",
        help: "Replace the text of message n (see /list).",
        handler: super::handle_edit,
    },
    Command {
        name: "delete",
        usage: "/delete <n>",
        help: "Delete message n; a question takes its reply with it.",
        handler: super::handle_delete,
    },
    Command {
        name: "list",
        usage: "/list",
        help: "Show the numbered transcript.",
        handler: super::handle_list,
    },
    Command {
        name: "new",
        usage: "/new",
        help: "Start a new conversation. The current one stays in history.",
        handler: super::handle_new,
    },
    Command {
        name: "clear",
        usage: "/clear",
        help: "Delete the current conversation and start over.",
        handler: super::handle_clear,
    },
    Command {
        name: "history",
        usage: "/history",
        help: "List saved conversations.",
        handler: super::handle_history,
    },
    Command {
        name: "load",
        usage: "/load <id>",
        help: "Switch to a saved conversation (an id prefix is enough).",
        handler: super::handle_load,
    },
    Command {
        name: "export",
        usage: "/export <json|md|txt> [path]",
        help: "Write the conversation to a file or directory.",
        handler: super::handle_export,
    },
    Command {
        name: "quit",
        usage: "/quit",
        help: "Leave the chat.",
        handler: super::handle_quit,
    },
];
