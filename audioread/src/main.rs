//! audioread - Read documents aloud with synchronized pages, chunks and bookmarks

mod config;
mod narrator;
mod reader;

use anyhow::{Context, Result, bail};
use audioread_core::text::char_slice;
use audioread_core::{
    Document, JsonFileStore, Library, LoadedDocument, ReadError, ReaderController,
};
use clap::{Parser, Subcommand};
use config::AudioReadConfig;
use narrator::ConsoleNarrator;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "audioread")]
#[command(about = "Read documents aloud with synchronized pages, chunks and bookmarks", long_about = None)]
#[command(version)]
struct Args {
    /// Enable debug output
    #[arg(short, long, default_value_t = false, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add a PDF, DOCX or TXT file to the library
    Add {
        /// Path to the document
        path: PathBuf,

        /// Title (default: the file name)
        #[arg(short, long)]
        title: Option<String>,
    },
    /// List documents in the library
    List,
    /// Remove a document with its bookmarks and reading position
    Remove {
        /// Document id (or a unique prefix)
        id: String,
    },
    /// Make a document the active one
    Select {
        /// Document id (or a unique prefix)
        id: String,
    },
    /// Show how a document is paginated
    Pages {
        /// Document id (default: the active document)
        id: Option<String>,
    },
    /// Show the speech chunks of a document and their pages
    Chunks {
        /// Document id (default: the active document)
        id: Option<String>,
    },
    /// Resolve a character offset to its chunk and page
    Locate {
        /// Absolute character offset
        offset: usize,

        /// Document id (default: the active document)
        #[arg(long)]
        id: Option<String>,
    },
    /// List a document's bookmarks
    Bookmarks {
        /// Document id (default: the active document)
        id: Option<String>,
    },
    /// Read a document aloud interactively
    Read {
        /// Document id (default: the active document)
        id: Option<String>,

        /// Playback rate (0.5-2.0)
        #[arg(long)]
        rate: Option<f32>,

        /// Preferred voice
        #[arg(long)]
        voice: Option<String>,

        /// Start at the beginning instead of the saved position
        #[arg(long)]
        from_start: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set default playback rate
    SetRate {
        /// Value (0.5-2.0)
        value: f32,
    },
    /// Set preferred voice
    SetVoice {
        /// Voice name
        name: String,
    },
    /// Set target words per page
    SetWordsPerPage {
        /// Value (at least 1)
        value: usize,
    },
    /// Set maximum characters per speech chunk
    SetChunkSize {
        /// Value (at least 1)
        value: usize,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(err) = run(args).await {
        eprintln!("{}", error_message(&err));
        std::process::exit(1);
    }
}

/// Message shown for a failed command. Document errors are shown as-is;
/// anything else keeps its context chain and is logged in full.
fn error_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ReadError>() {
        Some(read_err) if read_err.is_user_visible() => read_err.to_string(),
        _ => {
            log::warn!("{:?}", err);
            format!("Error: {:#}", err)
        }
    }
}

async fn run(args: Args) -> Result<()> {
    if let Commands::Config { action } = &args.command {
        return handle_config_command(action);
    }

    let mut config = AudioReadConfig::load().context("Failed to load configuration")?;
    let mut library = open_library(&config)?;

    match args.command {
        Commands::Add { path, title } => add_document(&mut library, &path, title),
        Commands::List => list_documents(&mut library),
        Commands::Remove { id } => {
            let document = find_document(&library, &id)?;
            library.remove(&document.id)?;
            println!("Removed \"{}\"", document.title);
            Ok(())
        }
        Commands::Select { id } => {
            let document = find_document(&library, &id)?;
            library.set_active(&document.id)?;
            println!("Active document: \"{}\"", document.title);
            Ok(())
        }
        Commands::Pages { id } => {
            let document = document_or_active(&mut library, id.as_deref())?;
            print_pages(&LoadedDocument::prepare(document, &config.reader_settings()));
            Ok(())
        }
        Commands::Chunks { id } => {
            let document = document_or_active(&mut library, id.as_deref())?;
            print_chunks(&LoadedDocument::prepare(document, &config.reader_settings()));
            Ok(())
        }
        Commands::Locate { offset, id } => {
            let document = document_or_active(&mut library, id.as_deref())?;
            let loaded = LoadedDocument::prepare(document, &config.reader_settings());
            println!("{}", locate(&loaded, offset));
            Ok(())
        }
        Commands::Bookmarks { id } => {
            let document = document_or_active(&mut library, id.as_deref())?;
            let bookmarks = library.bookmarks(&document.id)?;
            if bookmarks.is_empty() {
                println!("No bookmarks for \"{}\"", document.title);
            }
            for (i, bookmark) in bookmarks.iter().enumerate() {
                println!("{}", reader::format_bookmark(i, bookmark));
            }
            Ok(())
        }
        Commands::Read {
            id,
            rate,
            voice,
            from_start,
        } => {
            let document = document_or_active(&mut library, id.as_deref())?;
            if let Some(rate) = rate {
                config.rate = config::clamp_rate(rate);
            }
            if voice.is_some() {
                config.voice = voice;
            }
            if from_start {
                config.resume_last_position = false;
            }

            let narrator = ConsoleNarrator::new(config.words_per_minute);
            let mut controller =
                ReaderController::new(narrator, library, config.reader_settings());
            reader::run(&mut controller, &document.id).await
        }
        Commands::Config { .. } => Ok(()),
    }
}

/// Open the library in the configured directory, seeding it if empty.
fn open_library(config: &AudioReadConfig) -> Result<Library> {
    let dir = config.store_dir()?;
    let store = JsonFileStore::open(&dir)
        .with_context(|| format!("Failed to open library at {}", dir.display()))?;
    let mut library = Library::new(store);
    if let Err(e) = library.ensure_seeded() {
        log::warn!("Failed to seed library: {}", e);
    }
    Ok(library)
}

fn add_document(library: &mut Library, path: &Path, title: Option<String>) -> Result<()> {
    if !path.exists() {
        bail!("File not found: {}", path.display());
    }

    let extracted = audioread_core::extract(path)?;
    let title = title.unwrap_or_else(|| {
        path.file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string())
    });
    let document = library.add(&title, extracted)?;
    println!(
        "Added \"{}\" ({}, {} page(s)) as {}",
        document.title, document.kind, document.page_count, document.id
    );
    Ok(())
}

fn list_documents(library: &mut Library) -> Result<()> {
    let active = library.active_document()?.map(|doc| doc.id);
    let documents = library.documents()?;
    if documents.is_empty() {
        println!("Library is empty");
    }
    for document in documents {
        let marker = if active.as_deref() == Some(document.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{} {}  {:<4} {:>5} words  {}  {}",
            marker,
            short_id(&document.id),
            document.kind,
            audioread_core::text::count_words(&document.text),
            document
                .date_added
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M"),
            document.title
        );
    }
    Ok(())
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Find a document by id or unique id prefix.
fn find_document(library: &Library, key: &str) -> Result<Document> {
    let mut matches: Vec<Document> = library
        .documents()?
        .into_iter()
        .filter(|doc| doc.id.starts_with(key))
        .collect();

    if let Some(exact) = matches.iter().position(|doc| doc.id == key) {
        return Ok(matches.swap_remove(exact));
    }
    match matches.len() {
        0 => bail!("No document matches '{}'", key),
        1 => Ok(matches.remove(0)),
        n => bail!("'{}' matches {} documents; use more of the id", key, n),
    }
}

fn document_or_active(library: &mut Library, id: Option<&str>) -> Result<Document> {
    match id {
        Some(key) => find_document(library, key),
        None => library
            .active_document()?
            .context("Library is empty. Add a document with 'audioread add <file>'."),
    }
}

fn print_pages(loaded: &LoadedDocument) {
    println!(
        "\"{}\": {} page(s), extractor reported {}",
        loaded.document.title,
        loaded.pages.len(),
        loaded.document.page_count
    );
    for page in &loaded.pages {
        let chunks = loaded.mapping.chunks_for_page(page.page_number);
        println!(
            "{:>4}  [{}, {})  {:>5} words  {} chunk(s)  {}",
            page.page_number,
            page.start_position,
            page.end_position,
            page.word_count,
            chunks.len(),
            preview(&page.text)
        );
    }
}

fn print_chunks(loaded: &LoadedDocument) {
    println!(
        "\"{}\": {} chunk(s)",
        loaded.document.title,
        loaded.chunks.len()
    );
    for (index, chunk) in loaded.chunks.iter().enumerate() {
        let span = loaded.mapping.chunk_span(index).unwrap_or_default();
        println!(
            "{:>4}  [{}, {})  page {:>3}  {}",
            index,
            span.start,
            span.end,
            loaded.mapping.page_for_chunk(index),
            preview(chunk)
        );
    }
}

/// Describe where an offset lands.
fn locate(loaded: &LoadedDocument, offset: usize) -> String {
    let chunk = loaded.mapping.resolve(offset);
    let page = loaded.mapping.page_for(offset);
    format!(
        "offset {}: chunk {} + {} (chunk page {}), text page {} + {}",
        offset,
        chunk.chunk_index,
        chunk.offset_within_chunk,
        loaded.mapping.page_for_chunk(chunk.chunk_index),
        page.page_number,
        page.offset_within_page
    )
}

/// First line of text, shortened for listings.
fn preview(text: &str) -> String {
    const PREVIEW_CHARS: usize = 48;
    let line = text.lines().next().unwrap_or("");
    let short = char_slice(line, 0, PREVIEW_CHARS);
    if short.len() < line.len() {
        format!("{}...", short)
    } else {
        short.to_string()
    }
}

fn handle_config_command(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = AudioReadConfig::load()?;
            println!("Configuration file: {:?}", AudioReadConfig::config_path()?);
            println!();
            println!("max_chunk_size = {}", config.max_chunk_size);
            println!("words_per_page = {}", config.words_per_page);
            println!("rate = {}", config.rate);
            if let Some(voice) = &config.voice {
                println!("voice = \"{}\"", voice);
            } else {
                println!("voice = (engine default)");
            }
            println!("words_per_minute = {}", config.words_per_minute);
            println!("resume_last_position = {}", config.resume_last_position);
            println!("library = {}", config.store_dir()?.display());
        }
        ConfigAction::SetRate { value } => {
            let mut config = AudioReadConfig::load()?;
            config.rate = config::clamp_rate(*value);
            config.save()?;
            println!("Default rate set to: {}", config.rate);
        }
        ConfigAction::SetVoice { name } => {
            let mut config = AudioReadConfig::load()?;
            config.voice = Some(name.clone());
            config.save()?;
            println!("Default voice set to: {}", name);
        }
        ConfigAction::SetWordsPerPage { value } => {
            let mut config = AudioReadConfig::load()?;
            config.words_per_page = (*value).max(1);
            config.save()?;
            println!("Words per page set to: {}", config.words_per_page);
        }
        ConfigAction::SetChunkSize { value } => {
            let mut config = AudioReadConfig::load()?;
            config.max_chunk_size = (*value).max(1);
            config.save()?;
            println!("Maximum chunk size set to: {}", config.max_chunk_size);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use audioread_core::{DocumentKind, Extracted, ReaderSettings};

    fn txt(text: &str) -> Extracted {
        Extracted {
            text: text.to_string(),
            page_count: 1,
            kind: DocumentKind::Txt,
        }
    }

    #[test]
    fn test_error_message_for_document_errors() {
        let err = anyhow::Error::from(ReadError::UnsupportedFormat("epub".to_string()));
        assert_eq!(
            error_message(&err),
            ReadError::UnsupportedFormat("epub".to_string()).to_string()
        );

        let missing = std::env::temp_dir().join("audioread-missing.odt");
        let err = audioread_core::extract(&missing).unwrap_err();
        assert!(err.is_user_visible());
        let err = anyhow::Error::from(err).context("while adding");
        assert!(!error_message(&err).starts_with("Error:"));
    }

    #[test]
    fn test_error_message_for_internal_errors() {
        let err = anyhow::Error::from(ReadError::Persistence("disk full".to_string()))
            .context("Failed to save position");
        let message = error_message(&err);
        assert!(message.starts_with("Error: Failed to save position"));
        assert!(message.contains("disk full"));
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from(["audioread", "read", "--rate", "1.5", "--from-start"])
            .unwrap();
        match args.command {
            Commands::Read {
                id,
                rate,
                from_start,
                ..
            } => {
                assert!(id.is_none());
                assert_eq!(rate, Some(1.5));
                assert!(from_start);
            }
            other => panic!("unexpected command {:?}", other),
        }

        let args = Args::try_parse_from(["audioread", "locate", "320", "--id", "abc", "-d"]).unwrap();
        assert!(args.debug);
        assert!(matches!(args.command, Commands::Locate { offset: 320, .. }));
        assert!(Args::try_parse_from(["audioread"]).is_err());
    }

    #[test]
    fn test_find_document_by_prefix() {
        let mut library = Library::in_memory();
        let a = library.add("a.txt", txt("First.")).unwrap();
        let b = library.add("b.txt", txt("Second.")).unwrap();

        assert_eq!(find_document(&library, &a.id).unwrap().id, a.id);
        let prefix = &b.id[..12];
        assert_eq!(find_document(&library, prefix).unwrap().id, b.id);
        assert!(find_document(&library, "zzzz-not-an-id").is_err());
        // The empty prefix matches everything.
        assert!(find_document(&library, "").is_err());
    }

    #[test]
    fn test_document_or_active() {
        let mut library = Library::in_memory();
        assert!(document_or_active(&mut library, None).is_err());
        let a = library.add("a.txt", txt("First.")).unwrap();
        assert_eq!(document_or_active(&mut library, None).unwrap().id, a.id);
    }

    #[test]
    fn test_locate() {
        let document = Library::in_memory()
            .add("a.txt", txt("Hello world. This is AudioRead."))
            .unwrap();
        let settings = ReaderSettings {
            max_chunk_size: 10,
            ..ReaderSettings::default()
        };
        let loaded = LoadedDocument::prepare(document, &settings);
        assert_eq!(loaded.chunks, vec!["Hello world.", "This is AudioRead."]);
        assert_eq!(
            locate(&loaded, 14),
            "offset 14: chunk 1 + 2 (chunk page 1), text page 1 + 14"
        );
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("Short line\nsecond"), "Short line");
        let long = "x".repeat(60);
        assert_eq!(preview(&long), format!("{}...", "x".repeat(48)));
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789abcdef"), "01234567");
        assert_eq!(short_id("abc"), "abc");
    }
}
