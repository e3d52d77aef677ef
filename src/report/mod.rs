//! Report rendering.
//!
//! Pure formatters over analysis and probe results:
//! - `format_terminal`: colorized human-readable output
//! - `format_json`: machine-readable output for CI artifacts
//! - `format_markdown`: compact summary for PR comments
//! - `format_transcript`: full probe question/response dump

mod json;
mod markdown;
mod terminal;

pub use json::format_json;
pub use markdown::{format_markdown, format_transcript};
pub use terminal::{adjusted_overall, format_terminal};
