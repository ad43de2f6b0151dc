mod client;
mod types;
pub mod util;

pub use client::Claude;
pub use util::{strip_code_blocks, truncate_to_char_boundary};
