pub mod http;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::app::Result;
use crate::feed::FeedPage;

pub use http::{HttpFeedSource, HttpImageSource};

/// Chunked image body as it arrives from the remote source.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>>>;

/// Source of feed pages. `None` means the newest page.
#[async_trait]
pub trait FeedSource {
    async fn fetch_page(&self, url: Option<&str>) -> Result<FeedPage>;
}

/// Source of the binary image referenced by a feed entry.
#[async_trait]
pub trait ImageSource {
    async fn open_image(&self, external_id: u64) -> Result<ByteStream>;
}
