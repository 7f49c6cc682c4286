use clap::Subcommand;
use readtrack_core::{AppStore, BookRepository, BookStatus, Config, LibraryError, NewBook};

use super::{print_json, runtime, CliResult};

#[derive(Subcommand)]
pub enum BookAction {
    /// Add a book to the library
    Add {
        /// Book title
        title: String,
        /// Author name
        #[arg(long)]
        author: Option<String>,
        /// Number of pages
        #[arg(long)]
        total_pages: Option<u32>,
        /// Page the reader is on
        #[arg(long)]
        current_page: Option<u32>,
    },
    /// List all books
    List,
    /// Show one book
    Show {
        /// Book ID
        id: String,
    },
    /// Set the current page
    Page {
        /// Book ID
        id: String,
        /// Page number
        page: u32,
    },
    /// Change reading status (want-to-read, reading, completed)
    Status {
        /// Book ID
        id: String,
        /// New status
        status: BookStatus,
    },
    /// Remove a book and its sessions
    Remove {
        /// Book ID
        id: String,
    },
}

pub fn run(action: BookAction) -> CliResult {
    let store = AppStore::open()?;

    match action {
        BookAction::Add {
            title,
            author,
            total_pages,
            current_page,
        } => {
            let config = Config::load_or_default();
            let default_total = Some(config.library.default_total_pages).filter(|&n| n > 0);
            let book = store.add_book(NewBook {
                title,
                author,
                current_page,
                total_pages: total_pages.or(default_total),
            })?;
            print_json(&book)
        }
        BookAction::List => print_json(&store.list_books()),
        BookAction::Show { id } => {
            let book = store.book(&id).ok_or(LibraryError::BookNotFound(id))?;
            print_json(&book)
        }
        BookAction::Page { id, page } => {
            runtime()?.block_on(store.set_current_page(&id, page))?;
            print_json(&store.book(&id))
        }
        BookAction::Status { id, status } => {
            runtime()?.block_on(store.set_status(&id, status))?;
            print_json(&store.book(&id))
        }
        BookAction::Remove { id } => {
            let removed = store.remove_book(&id)?;
            print_json(&removed)
        }
    }
}
