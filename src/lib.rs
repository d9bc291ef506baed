mod config;
mod paths;
mod zstd_jsonl;
mod records;
mod schema;
mod store;

mod import;
mod enrich;
mod profile;

mod progress;
mod util;

pub use crate::config::{EnrichOptions, ImportOptions, RedditCredentials, DB_PATH, INPUT_DIR};
pub use crate::paths::{classify, discover_archives, Discovered, FileKind};

// Archive streaming and record parsing.
pub use crate::zstd_jsonl::{ArchiveError, ArchiveLines};
pub use crate::records::{
    detect_image, selftext_or_link, strip_link_prefix, ArchiveRecord, Comment, ParseError, Submission,
};

// Store and schema.
pub use crate::schema::PSEUDO_AUTHORS;
pub use crate::store::{FailedUserRow, Store, UserRow};

// Import passes.
pub use crate::import::{import_all, import_archive, ingest_lines, ImportStats, ImportSummary};

// Enrichment.
pub use crate::enrich::{enrich_authors, fetch_and_store_users, EnrichStats, SUSPENDED_OR_NONE};
pub use crate::profile::{ProfileError, ProfileSource, RedditClient, RetryPolicy, UserProfile};

pub use crate::util::init_tracing_once;
