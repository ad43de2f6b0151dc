//! Digest generation: a time-windowed, priority-ranked HTML summary of a
//! user's recent content.

mod aggregator;
mod render;

pub use aggregator::{rank_entries, DigestError, DigestGenerator, DIGEST_TOP_N};
pub use render::{render_digest_html, DigestItem};
