//! Content acquisition: RSS/Atom feed polling and page fetching.

mod page;
mod poller;

pub use page::{FetchedPage, HttpPageFetcher, MockPageFetcher, PageFetcher};
pub use poller::{FeedEntry, FeedPollOutcome, FeedPoller};
