use clap::Subcommand;
use readtrack_core::AppStore;

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum SessionAction {
    /// List saved reading sessions, oldest first
    List {
        /// Only sessions for this book
        #[arg(long)]
        book: Option<String>,
    },
}

pub fn run(action: SessionAction) -> CliResult {
    let store = AppStore::open()?;
    match action {
        SessionAction::List { book } => {
            let sessions = match book {
                Some(id) => store.sessions_for(&id),
                None => store.sessions(),
            };
            print_json(&sessions)
        }
    }
}
