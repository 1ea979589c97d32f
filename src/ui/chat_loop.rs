//! Interactive chat on stdin/stdout.
//!
//! One task owns the [`App`]; it selects over input lines, consumer updates
//! and Ctrl+C, so a streaming reply can be stopped without leaving the chat.

use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::commands::{process_input, CommandResult};
use crate::core::app::App;
use crate::core::backend::{ChatBackend, HttpBackend};
use crate::core::chat_stream::StreamMessage;
use crate::core::config::ClientSettings;
use crate::core::storage::ConversationStore;
use crate::ui::renderer::{render_history, render_transcript, reply_prefix, StreamView, PROMPT};

fn write_flush(text: &str) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()
}

fn start_reply(view: &mut StreamView) -> io::Result<()> {
    view.reset();
    write_flush(&reply_prefix())
}

fn finish_reply(app: &mut App, view: &mut StreamView) -> io::Result<()> {
    view.reset();
    write_flush("\n")?;
    if let Some(error) = app.last_error() {
        eprintln!("❌ {error}");
        app.dismiss_error();
    }
    write_flush(PROMPT)
}

pub async fn run_chat(settings: ClientSettings) -> Result<(), Box<dyn Error>> {
    let backend: Arc<dyn ChatBackend> = Arc::new(HttpBackend::new(
        reqwest::Client::new(),
        settings.api_url.clone(),
    ));
    let store = ConversationStore::open(&settings.data_dir);
    let (mut app, mut rx) = App::new(backend, store);
    info!(
        api_url = %settings.api_url,
        data_dir = %settings.data_dir.display(),
        conversation = %app.current_conversation().id,
        "Chat session started"
    );

    println!(
        "Mental coach via {}. Type /help for commands, /quit to leave.",
        settings.api_url
    );
    if !app.messages().is_empty() {
        print!("{}", render_transcript(app.messages()));
    }
    write_flush(PROMPT)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut view = StreamView::default();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };

                match process_input(&mut app, &line) {
                    CommandResult::Continue => {}
                    CommandResult::Notice(message) => println!("{message}"),
                    CommandResult::ProcessAsMessage(text) => {
                        if app.is_pending() && !text.trim().is_empty() {
                            println!("Still replying. Press Ctrl+C to stop it first.");
                        } else if app.send(&text, false).is_some() {
                            start_reply(&mut view)?;
                        }
                    }
                    CommandResult::StreamStarted => start_reply(&mut view)?,
                    CommandResult::ShowTranscript => print!("{}", render_transcript(app.messages())),
                    CommandResult::ShowHistory => print!(
                        "{}",
                        render_history(&app.history(), Some(app.current_conversation().id.as_str()))
                    ),
                    CommandResult::Quit => break,
                }

                if !app.is_pending() {
                    write_flush(PROMPT)?;
                }
            }
            Some((message, stream_id)) = rx.recv() => {
                let content = match &message {
                    StreamMessage::Content(content) => Some(content.clone()),
                    StreamMessage::Error(_) | StreamMessage::End => None,
                };
                if !app.apply_stream_message(message, stream_id) {
                    continue;
                }
                if let Some(content) = content {
                    write_flush(&view.advance(&content))?;
                }
                if !app.is_pending() {
                    finish_reply(&mut app, &mut view)?;
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                if app.stop() {
                    println!(" (stopped)");
                    view.reset();
                    write_flush(PROMPT)?;
                } else {
                    println!();
                    break;
                }
            }
        }
    }

    app.stop();
    Ok(())
}
