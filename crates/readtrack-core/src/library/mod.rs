mod book;
mod session;

pub use book::{check_page, Book, BookStatus, NewBook};
pub use session::ReadingSession;
