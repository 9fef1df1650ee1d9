mod posts;
mod traits;

pub use posts::SqlitePostRepository;
pub use traits::{DEFAULT_PAGE_SIZE, FeedQuery, MAX_PAGE_SIZE, PostRepository, Share};
