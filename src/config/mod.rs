//! Configuration for the pipeline commands
//!
//! Settings are assembled from command-line arguments, normalized
//! (trailing slashes are stripped from locations, matching how the
//! partition paths are composed) and validated before a run starts.

mod types;
mod validation;

pub use types::{CapturesSettings, ListSettings};
pub use validation::validate_crawl_id;
