mod clock;
mod scanner;
mod storage;
mod thumbs;

pub use clock::SystemClock;
pub use scanner::WalkdirImageScanner;
pub use storage::FsBookStorage;
pub use thumbs::{thumbnail_path, FsThumbnailGenerator};
