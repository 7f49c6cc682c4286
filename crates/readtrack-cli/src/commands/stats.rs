use chrono::Utc;
use readtrack_core::{AppStore, ReadingStats};

use super::{print_json, CliResult};

pub fn run() -> CliResult {
    let store = AppStore::open()?;
    let stats = ReadingStats::from_sessions(&store.sessions(), Utc::now().date_naive());
    print_json(&stats)
}
