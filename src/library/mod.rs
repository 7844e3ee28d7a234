use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

mod upload;

pub use upload::{probe, submit, BookSubmission, UploadStatus};

use crate::config::{AppConfig, DEFAULT_SERVER_URL};

pub const LIBRARY_FILE: &str = "bookshelf.json";

#[derive(Subcommand)]
pub enum LibraryAction {
    /// Upload a book cover (and optional PDF), then add the card
    Add {
        /// Book name
        #[arg(short, long)]
        name: String,

        /// Author name
        #[arg(short, long, default_value = "")]
        author: String,

        /// Cover image to upload
        #[arg(short, long, value_name = "PATH")]
        cover: PathBuf,

        /// Book PDF to upload
        #[arg(short, long, value_name = "PATH")]
        pdf: Option<PathBuf>,

        /// Ask the relay to derive the cover from the PDF's first page
        #[arg(long)]
        use_first_page: bool,

        /// Relay server URL (e.g. http://localhost:8000)
        #[arg(short, long)]
        server: Option<String>,
    },

    /// Show every book in the collection
    List,

    /// Remove all books from the collection
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Check whether the relay can reach the media host
    Probe {
        /// Relay server URL (e.g. http://localhost:8000)
        #[arg(short, long)]
        server: Option<String>,
    },
}

/// One card in the collection. Built only from a successful upload
/// response and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookRecord {
    pub name: String,
    #[serde(default)]
    pub author: String,
    pub cover_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// The whole client-side state: the book list plus where it is saved.
pub struct Library {
    path: PathBuf,
    books: Vec<BookRecord>,
}

impl Library {
    /// Read the saved list once. An unreadable or corrupt file means an
    /// empty collection, never an error.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let books = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(books) => books,
                Err(err) => {
                    warn!(
                        "Library file {} is unreadable ({}), starting empty",
                        path.display(),
                        err
                    );
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        Self { path, books }
    }

    /// Overwrite the saved list wholesale.
    pub fn save(&self) -> Result<()> {
        let content =
            serde_json::to_string_pretty(&self.books).context("Failed to serialize library")?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }

    pub fn books(&self) -> &[BookRecord] {
        &self.books
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn add(&mut self, book: BookRecord) {
        self.books.push(book);
    }

    pub fn clear(&mut self) {
        self.books.clear();
    }

    /// Full rebuild of the visible card list from the current state, so
    /// it is safe to call after any mutation.
    pub fn render(&self) -> String {
        if self.books.is_empty() {
            return "No books in your collection yet\n".to_string();
        }

        let mut out = String::new();
        for book in &self.books {
            out.push_str(&format!("{}\n", book.name));
            if !book.author.is_empty() {
                out.push_str(&format!("  by {}\n", book.author));
            }
            out.push_str(&format!("  cover: {}\n", book.cover_url));
            if let Some(pdf_url) = &book.pdf_url {
                out.push_str(&format!("  pdf:   {}\n", pdf_url));
            }
            out.push_str(&format!(
                "  added: {}\n",
                book.uploaded_at.format("%Y-%m-%d %H:%M")
            ));
        }
        out
    }
}

pub fn run(action: LibraryAction, config: Option<&AppConfig>) -> Result<()> {
    match action {
        LibraryAction::Add {
            name,
            author,
            cover,
            pdf,
            use_first_page,
            server,
        } => {
            let server = resolve_server(server, config);
            let mut library = Library::load(resolve_library_path(config));
            let submission = BookSubmission {
                name,
                author,
                use_first_page,
                cover,
                pdf,
            };
            let record = submit(&server, &submission)?;
            library.add(record);
            library.save()?;
            println!("{}", library.render());
            Ok(())
        }

        LibraryAction::List => {
            let library = Library::load(resolve_library_path(config));
            println!("{}", library.render());
            Ok(())
        }

        LibraryAction::Clear { yes } => {
            let mut library = Library::load(resolve_library_path(config));
            if library.is_empty() {
                println!("{}", library.render());
                return Ok(());
            }
            let confirmed = yes
                || dialoguer::Confirm::new()
                    .with_prompt("Are you sure you want to remove all books?")
                    .default(false)
                    .interact()?;
            if !confirmed {
                info!("Clear cancelled");
                return Ok(());
            }
            library.clear();
            library.save()?;
            info!("All books cleared");
            println!("{}", library.render());
            Ok(())
        }

        LibraryAction::Probe { server } => {
            let server = resolve_server(server, config);
            probe(&server)
        }
    }
}

fn resolve_server(flag: Option<String>, config: Option<&AppConfig>) -> String {
    flag.or_else(|| config.and_then(|c| c.server.clone()))
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string())
}

fn resolve_library_path(config: Option<&AppConfig>) -> PathBuf {
    config
        .and_then(|c| c.library.clone())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(LIBRARY_FILE))
}
