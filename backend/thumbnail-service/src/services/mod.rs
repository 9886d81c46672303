/// Business logic layer for thumbnail-service
pub mod thumbnail;

pub use thumbnail::ThumbnailManager;
