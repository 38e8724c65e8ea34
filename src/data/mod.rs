mod idea;
mod storage;
mod story;

pub use idea::{HeadlineSource, Idea, Selection};
pub use storage::{Storage, StorageError};
pub use story::StoryRecord;
pub(crate) use story::compact_date;
