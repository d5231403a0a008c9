//! Interactive reading session.
//!
//! User commands arrive on stdin and speech events from the engine; both are
//! handled one at a time on the same task. A separate highlighter task
//! subscribes to the controller and reports where reading is.

use anyhow::{Context, Result, bail};
use audioread_core::{Bookmark, Intent, Outcome, ReaderController, ReaderEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// A line typed during a session.
#[derive(Debug, Clone, PartialEq)]
pub enum ReaderCommand {
    Intent(Intent),
    Status,
    /// Print the current page
    Show,
    Bookmarks,
    Help,
    Quit,
}

const HELP: &str = "\
Commands:
  <enter>, toggle     play or pause
  play, pause, resume, stop
  next, prev          next or previous chunk
  page N              go to page N
  next-page, prev-page
  click OFFSET        read from a character offset
  mark                bookmark the current position
  bookmarks           list bookmarks
  jump N, unmark N    jump to or delete bookmark N
  rate R              playback rate (0.5-2.0)
  voice NAME|default  preferred voice
  show, status, help, quit";

/// Parse one line of input.
pub fn parse_command(line: &str) -> Result<ReaderCommand> {
    let mut parts = line.split_whitespace();
    let Some(word) = parts.next() else {
        return Ok(ReaderCommand::Intent(Intent::TogglePlayPause));
    };
    let argument = parts.next();

    let command = match word.to_ascii_lowercase().as_str() {
        "toggle" | "p" => ReaderCommand::Intent(Intent::TogglePlayPause),
        "play" => ReaderCommand::Intent(Intent::Play),
        "pause" => ReaderCommand::Intent(Intent::Pause),
        "resume" => ReaderCommand::Intent(Intent::Resume),
        "stop" => ReaderCommand::Intent(Intent::Stop),
        "next" | "n" => ReaderCommand::Intent(Intent::Next),
        "prev" | "previous" => ReaderCommand::Intent(Intent::Previous),
        "page" => ReaderCommand::Intent(Intent::GoToPage(number(word, argument)?)),
        "next-page" => ReaderCommand::Intent(Intent::NextPage),
        "prev-page" => ReaderCommand::Intent(Intent::PreviousPage),
        "click" => ReaderCommand::Intent(Intent::ClickWord {
            global_offset: number(word, argument)?,
        }),
        "mark" => ReaderCommand::Intent(Intent::AddBookmark),
        "jump" => ReaderCommand::Intent(Intent::JumpToBookmark(bookmark_index(word, argument)?)),
        "unmark" => ReaderCommand::Intent(Intent::RemoveBookmark(bookmark_index(word, argument)?)),
        "rate" => {
            let rate: f32 = argument
                .with_context(|| "rate needs a value")?
                .parse()
                .with_context(|| "rate must be a number")?;
            ReaderCommand::Intent(Intent::SetRate(rate))
        }
        "voice" => match argument {
            Some("default") => ReaderCommand::Intent(Intent::SetVoice(None)),
            Some(_) => {
                let name = line.trim_start()[word.len()..].trim().to_string();
                ReaderCommand::Intent(Intent::SetVoice(Some(name)))
            }
            None => bail!("voice needs a name or 'default'"),
        },
        "status" => ReaderCommand::Status,
        "show" => ReaderCommand::Show,
        "bookmarks" | "marks" => ReaderCommand::Bookmarks,
        "help" | "?" => ReaderCommand::Help,
        "quit" | "q" | "exit" => ReaderCommand::Quit,
        other => bail!("Unknown command '{}'. Type 'help' for commands.", other),
    };
    Ok(command)
}

fn number(command: &str, argument: Option<&str>) -> Result<usize> {
    argument
        .with_context(|| format!("{} needs a number", command))?
        .parse()
        .with_context(|| format!("{} needs a number", command))
}

/// Bookmarks are numbered from 1 on screen.
fn bookmark_index(command: &str, argument: Option<&str>) -> Result<usize> {
    match number(command, argument)? {
        0 => bail!("Bookmarks are numbered from 1"),
        n => Ok(n - 1),
    }
}

/// Run a session on a library document until the user quits or input ends.
pub async fn run(controller: &mut ReaderController, document_id: &str) -> Result<()> {
    let highlighter = tokio::spawn(highlight(controller.subscribe()));
    let mut speech = controller.speech_events();

    report(controller.open(document_id)?);
    if let Some(loaded) = controller.document() {
        eprintln!(
            "Reading \"{}\" with the {} engine",
            loaded.document.title,
            controller.engine_name()
        );
    }
    eprintln!("{}", status_line(controller));
    eprintln!("Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };
                match parse_command(&line) {
                    Ok(ReaderCommand::Quit) => break,
                    Ok(command) => execute(controller, command),
                    Err(e) => eprintln!("{}", e),
                }
            }
            event = speech.recv() => match event {
                Ok(event) => {
                    controller.handle_speech_event(event);
                }
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Missed {} speech events", skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    controller.apply(Intent::Stop);
    controller.close();
    highlighter.abort();
    Ok(())
}

fn execute(controller: &mut ReaderController, command: ReaderCommand) {
    match command {
        ReaderCommand::Intent(intent) => report(controller.apply(intent)),
        ReaderCommand::Status => eprintln!("{}", status_line(controller)),
        ReaderCommand::Show => match current_page_text(controller) {
            Some(text) => println!("{}", text),
            None => eprintln!("Nothing to show"),
        },
        ReaderCommand::Bookmarks => match controller.bookmarks() {
            Ok(bookmarks) if bookmarks.is_empty() => eprintln!("No bookmarks"),
            Ok(bookmarks) => {
                for (i, bookmark) in bookmarks.iter().enumerate() {
                    println!("{}", format_bookmark(i, bookmark));
                }
            }
            Err(e) => eprintln!("Failed to load bookmarks: {}", e),
        },
        ReaderCommand::Help => eprintln!("{}", HELP),
        ReaderCommand::Quit => {}
    }
}

fn report(outcome: Outcome) {
    if let Outcome::SoftFailure(failure) = outcome {
        eprintln!("{}", failure);
    }
}

/// One-line summary of where reading is.
pub fn status_line(controller: &ReaderController) -> String {
    let Some(loaded) = controller.document() else {
        return format!("[{}] no document", controller.state());
    };
    let cursor = controller.cursor();
    format!(
        "[{}] page {}/{}, chunk {}/{}, offset {}, rate {}x",
        controller.state(),
        cursor.page,
        loaded.pages.len(),
        (cursor.chunk + 1).min(loaded.chunks.len()),
        loaded.chunks.len(),
        cursor.global_offset,
        controller.settings().options.rate
    )
}

fn current_page_text(controller: &ReaderController) -> Option<String> {
    let loaded = controller.document()?;
    let page = loaded.page(controller.cursor().page)?;
    Some(format!(
        "--- page {} ({} words) ---\n{}",
        page.page_number, page.word_count, page.text
    ))
}

/// A bookmark as listed to the user, numbered from 1.
pub fn format_bookmark(index: usize, bookmark: &Bookmark) -> String {
    format!(
        "{:>3}. page {}, chunk {}, offset {} ({}) \"{}\"",
        index + 1,
        bookmark.cursor.page,
        bookmark.cursor.chunk + 1,
        bookmark.cursor.global_offset,
        bookmark.timestamp.format("%Y-%m-%d %H:%M"),
        bookmark.snippet
    )
}

/// Highlighter: reports region and state changes as they happen.
async fn highlight(mut events: broadcast::Receiver<ReaderEvent>) {
    let mut chunks = 0;
    loop {
        match events.recv().await {
            Ok(event) => {
                if let ReaderEvent::DocumentLoaded { chunks: count, .. } = &event {
                    chunks = *count;
                }
                if let Some(line) = describe(&event, chunks) {
                    eprintln!("{}", line);
                }
            }
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        }
    }
}

fn describe(event: &ReaderEvent, chunks: usize) -> Option<String> {
    match event {
        ReaderEvent::DocumentLoaded { chunks, pages, .. } => {
            Some(format!("Loaded: {} chunks on {} pages", chunks, pages))
        }
        ReaderEvent::CursorMoved(cursor) => Some(format!(
            "> page {}, chunk {}/{}",
            cursor.page,
            cursor.chunk + 1,
            chunks
        )),
        ReaderEvent::StateChanged(state) => Some(format!("[{}]", state)),
        ReaderEvent::Progress(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audioread_core::speech::RecordingEngine;
    use audioread_core::{Cursor, DocumentKind, Extracted, Library, PlaybackState, ReaderSettings};

    #[test]
    fn test_parse_playback_commands() {
        assert_eq!(
            parse_command("").unwrap(),
            ReaderCommand::Intent(Intent::TogglePlayPause)
        );
        assert_eq!(
            parse_command("  PLAY ").unwrap(),
            ReaderCommand::Intent(Intent::Play)
        );
        assert_eq!(
            parse_command("n").unwrap(),
            ReaderCommand::Intent(Intent::Next)
        );
        assert_eq!(
            parse_command("prev-page").unwrap(),
            ReaderCommand::Intent(Intent::PreviousPage)
        );
        assert_eq!(parse_command("q").unwrap(), ReaderCommand::Quit);
    }

    #[test]
    fn test_parse_commands_with_arguments() {
        assert_eq!(
            parse_command("page 3").unwrap(),
            ReaderCommand::Intent(Intent::GoToPage(3))
        );
        assert_eq!(
            parse_command("click 320").unwrap(),
            ReaderCommand::Intent(Intent::ClickWord { global_offset: 320 })
        );
        assert_eq!(
            parse_command("jump 1").unwrap(),
            ReaderCommand::Intent(Intent::JumpToBookmark(0))
        );
        assert_eq!(
            parse_command("unmark 2").unwrap(),
            ReaderCommand::Intent(Intent::RemoveBookmark(1))
        );
        assert_eq!(
            parse_command("rate 1.5").unwrap(),
            ReaderCommand::Intent(Intent::SetRate(1.5))
        );
        assert_eq!(
            parse_command("voice Google UK English").unwrap(),
            ReaderCommand::Intent(Intent::SetVoice(Some("Google UK English".to_string())))
        );
        assert_eq!(
            parse_command("voice default").unwrap(),
            ReaderCommand::Intent(Intent::SetVoice(None))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_command("page").is_err());
        assert!(parse_command("page two").is_err());
        assert!(parse_command("jump 0").is_err());
        assert!(parse_command("rate fast").is_err());
        assert!(parse_command("voice").is_err());
        assert!(parse_command("dance").is_err());
    }

    #[test]
    fn test_status_line() {
        let mut library = Library::in_memory();
        let id = library
            .add(
                "a.txt",
                Extracted {
                    text: "One two. Three four.".to_string(),
                    page_count: 1,
                    kind: DocumentKind::Txt,
                },
            )
            .unwrap()
            .id;
        let settings = ReaderSettings {
            max_chunk_size: 5,
            ..ReaderSettings::default()
        };
        let mut controller = ReaderController::new(RecordingEngine::new(), library, settings);
        assert_eq!(status_line(&controller), "[idle] no document");

        controller.open(&id).unwrap();
        controller.apply(Intent::Next);
        controller.apply(Intent::Play);
        assert_eq!(controller.state(), PlaybackState::Speaking);
        assert_eq!(
            status_line(&controller),
            "[speaking] page 1/1, chunk 2/2, offset 8, rate 1x"
        );
        assert_eq!(
            current_page_text(&controller).unwrap(),
            "--- page 1 (4 words) ---\nOne two. Three four."
        );
    }

    #[test]
    fn test_format_bookmark() {
        let bookmark = Bookmark::new("doc", Cursor::start(), "Hello there");
        let line = format_bookmark(0, &bookmark);
        assert!(line.starts_with("  1. page 1, chunk 1, offset 0 ("));
        assert!(line.ends_with("\"Hello there\""));
    }

    #[test]
    fn test_describe_events() {
        assert_eq!(
            describe(&ReaderEvent::CursorMoved(Cursor::start()), 4).unwrap(),
            "> page 1, chunk 1/4"
        );
        assert_eq!(
            describe(&ReaderEvent::StateChanged(PlaybackState::Paused), 4).unwrap(),
            "[paused]"
        );
        assert!(describe(&ReaderEvent::Progress(Cursor::start()), 4).is_none());
    }
}
