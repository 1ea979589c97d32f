use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Local, Utc};
use thiserror::Error;

use crate::core::conversation::Conversation;

const RULE_WIDTH: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    Json,
    #[default]
    Markdown,
    Text,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Markdown => "md",
            ExportFormat::Text => "txt",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "md" | "markdown" => Ok(ExportFormat::Markdown),
            "txt" | "text" => Ok(ExportFormat::Text),
            other => Err(format!(
                "unknown export format '{other}' (expected json, md or txt)"
            )),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to serialize conversation: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn local_time(timestamp: &DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

pub fn render(conversation: &Conversation, format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(conversation)?),
        ExportFormat::Markdown => Ok(render_markdown(conversation)),
        ExportFormat::Text => Ok(render_text(conversation)),
    }
}

fn render_markdown(conversation: &Conversation) -> String {
    let mut out = String::from("# Conversation\n\n");
    out.push_str(&format!(
        "**Created:** {}\n",
        local_time(&conversation.created_at)
    ));
    out.push_str(&format!(
        "**Updated:** {}\n\n",
        local_time(&conversation.updated_at)
    ));
    out.push_str("---\n\n");

    for msg in &conversation.messages {
        out.push_str(&format!("## {}\n\n{}\n\n---\n\n", msg.role.label(), msg.content));
    }
    out
}

fn render_text(conversation: &Conversation) -> String {
    let mut out = String::from("Conversation\n");
    out.push_str(&format!(
        "Created: {}\n",
        local_time(&conversation.created_at)
    ));
    out.push_str(&format!(
        "Updated: {}\n\n",
        local_time(&conversation.updated_at)
    ));
    out.push_str(&"=".repeat(RULE_WIDTH));
    out.push_str("\n\n");

    for msg in &conversation.messages {
        out.push_str(&format!(
            "{}:\n{}\n\n{}\n\n",
            msg.role.label(),
            msg.content,
            "-".repeat(RULE_WIDTH)
        ));
    }
    out
}

pub fn export_filename(conversation: &Conversation, format: ExportFormat) -> String {
    format!(
        "conversation-{}.{}",
        conversation.short_id(),
        format.extension()
    )
}

/// Writes the rendered conversation. An existing directory as `target`
/// receives a file named by [`export_filename`]; anything else is used as
/// the file path.
pub fn write_export(
    conversation: &Conversation,
    format: ExportFormat,
    target: &Path,
) -> Result<PathBuf, ExportError> {
    let path = if target.is_dir() {
        target.join(export_filename(conversation, format))
    } else {
        target.to_path_buf()
    };

    let content = render(conversation, format)?;
    fs::write(&path, content).map_err(|source| ExportError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::conversation_with;
    use tempfile::TempDir;

    fn sample() -> Conversation {
        conversation_with(&[
            ("user", "I can't focus today."),
            ("assistant", "Try a **five minute** walk.\n\nThen pick one small task."),
        ])
    }

    #[test]
    fn json_export_round_trips_exactly() {
        let conversation = sample();
        let rendered = render(&conversation, ExportFormat::Json).unwrap();
        let parsed: Conversation = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed, conversation);
    }

    #[test]
    fn markdown_export_uses_level_two_headings_per_turn() {
        let rendered = render(&sample(), ExportFormat::Markdown).unwrap();
        assert!(rendered.starts_with("# Conversation\n\n**Created:** "));
        assert!(rendered.contains("## You\n\nI can't focus today.\n\n---\n\n"));
        assert!(rendered.contains(
            "## AI\n\nTry a **five minute** walk.\n\nThen pick one small task.\n\n---\n\n"
        ));
    }

    #[test]
    fn text_export_prefixes_roles_and_separates_turns() {
        let rendered = render(&sample(), ExportFormat::Text).unwrap();
        let rule = "-".repeat(RULE_WIDTH);
        assert!(rendered.starts_with("Conversation\nCreated: "));
        assert!(rendered.contains(&"=".repeat(RULE_WIDTH)));
        assert!(rendered.contains(&format!("You:\nI can't focus today.\n\n{rule}\n\n")));
        assert!(rendered.contains("AI:\nTry a **five minute** walk."));
    }

    #[test]
    fn format_names_parse_leniently() {
        assert_eq!("MD".parse::<ExportFormat>(), Ok(ExportFormat::Markdown));
        assert_eq!("text".parse::<ExportFormat>(), Ok(ExportFormat::Text));
        assert_eq!("json".parse::<ExportFormat>(), Ok(ExportFormat::Json));
        assert!("pdf".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn write_export_into_directory_uses_short_id_filename() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut conversation = sample();
        conversation.id = "0123456789abcdef".to_string();

        let path = write_export(&conversation, ExportFormat::Text, temp_dir.path()).unwrap();

        assert_eq!(path.file_name().unwrap(), "conversation-01234567.txt");
        let written = fs::read_to_string(path).unwrap();
        assert!(written.contains("I can't focus today."));
    }

    #[test]
    fn write_export_to_explicit_file_path() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let target = temp_dir.path().join("session.md");

        let path = write_export(&sample(), ExportFormat::Markdown, &target).unwrap();

        assert_eq!(path, target);
        assert!(fs::read_to_string(path).unwrap().contains("## AI"));
    }
}
