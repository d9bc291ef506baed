//! Typed submission/comment rows built from one JSONL line of an RS/RC dump.
//!
//! A line is read as a JSON object and each column is picked out of it on its
//! own, so a field with an unexpected type becomes NULL instead of dropping the
//! row. Only invalid JSON and a missing id reject a line. Derived columns
//! (`has_image`, `image_url`, and the `selftext` fallback) are pure functions of
//! the raw record, so replaying a line always produces the same row.

use crate::schema::{UPSERT_COMMENT, UPSERT_SUBMISSION};
use rusqlite::{params, Statement};
use serde_json::{Map, Value};
use thiserror::Error;

/// Domains whose submissions are direct image links.
pub const IMAGE_HOST_PREFIXES: [&str; 2] = ["i.redd.it", "i.imgur.com"];

/// Reddit "thing" prefix for links (submissions), stripped from `link_id`.
pub const LINK_PREFIX: &str = "t3_";

/// Why a line was dropped.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record has no id")]
    MissingId,
}

/// A row type that can be parsed from a dump line and upserted by primary key.
pub trait ArchiveRecord: Sized {
    /// Table name, also used as the plural noun in log lines.
    const KIND: &'static str;
    const UPSERT_SQL: &'static str;

    fn from_json(line: &str) -> Result<Self, ParseError>;

    /// Execute the prepared `UPSERT_SQL` statement for this row.
    fn bind(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize>;
}

/// The top-level object of one line. Repeated keys keep the last value.
struct Fields(Map<String, Value>);

impl Fields {
    fn parse(line: &str) -> Result<Self, ParseError> {
        Ok(Fields(serde_json::from_str(line)?))
    }

    /// Strings as-is; numbers in their JSON text form (what a TEXT column would hold).
    fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Integers, floats (truncated) and numeric strings; older dumps
    /// store `created_utc` as a string.
    fn int(&self, key: &str) -> Option<i64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => {
                let t = s.trim();
                t.parse::<i64>().ok().or_else(|| t.parse::<f64>().ok().map(|f| f as i64))
            }
            _ => None,
        }
    }

    /// Booleans, or 0/1 style integers.
    fn flag(&self, key: &str) -> Option<bool> {
        match self.0.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|v| v != 0),
            _ => None,
        }
    }

    fn id(&self) -> Result<String, ParseError> {
        match self.text("id") {
            Some(s) if !s.trim().is_empty() => Ok(s),
            _ => Err(ParseError::MissingId),
        }
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.is_empty())
}

/// One row of `submissions`.
#[derive(Clone, Debug, PartialEq)]
pub struct Submission {
    pub id: String,
    pub subreddit: Option<String>,
    pub title: Option<String>,
    pub selftext: Option<String>,
    pub author: Option<String>,
    pub created_utc: Option<i64>,
    pub score: Option<i64>,
    pub num_comments: Option<i64>,
    pub is_self: Option<bool>,
    pub retrieved_on: Option<i64>,
    pub stickied: Option<bool>,
    pub over_18: Option<bool>,
    pub spoiler: Option<bool>,
    pub locked: Option<bool>,
    pub distinguished: Option<String>,
    pub permalink: Option<String>,
    pub has_image: bool,
    pub image_url: Option<String>,
}

/// `(has_image, image_url)` for a submission.
pub fn detect_image(post_hint: Option<&str>, domain: Option<&str>, url: Option<&str>) -> (bool, Option<String>) {
    let domain = domain.unwrap_or("");
    let has_image = post_hint == Some("image") || IMAGE_HOST_PREFIXES.iter().any(|p| domain.starts_with(p));
    let image_url = if has_image { non_empty(url).map(str::to_string) } else { None };
    (has_image, image_url)
}

/// Body text for a submission: the selftext, or for link posts the target url.
pub fn selftext_or_link(selftext: Option<String>, is_self: Option<bool>, url: Option<&str>) -> Option<String> {
    match selftext {
        Some(s) if !s.is_empty() => Some(s),
        _ if !is_self.unwrap_or(false) => non_empty(url).map(str::to_string),
        _ => None,
    }
}

impl ArchiveRecord for Submission {
    const KIND: &'static str = "submissions";
    const UPSERT_SQL: &'static str = UPSERT_SUBMISSION;

    fn from_json(line: &str) -> Result<Self, ParseError> {
        let f = Fields::parse(line)?;
        let id = f.id()?;
        let url = f.text("url");
        let is_self = f.flag("is_self");
        let (has_image, image_url) =
            detect_image(f.text("post_hint").as_deref(), f.text("domain").as_deref(), url.as_deref());
        Ok(Submission {
            id,
            subreddit: f.text("subreddit"),
            title: f.text("title"),
            selftext: selftext_or_link(f.text("selftext"), is_self, url.as_deref()),
            author: f.text("author"),
            created_utc: f.int("created_utc"),
            score: f.int("score"),
            num_comments: f.int("num_comments"),
            is_self,
            retrieved_on: f.int("retrieved_on"),
            stickied: f.flag("stickied"),
            over_18: f.flag("over_18"),
            spoiler: f.flag("spoiler"),
            locked: f.flag("locked"),
            distinguished: f.text("distinguished"),
            permalink: f.text("permalink"),
            has_image,
            image_url,
        })
    }

    fn bind(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![
            self.id,
            self.subreddit,
            self.title,
            self.selftext,
            self.author,
            self.created_utc,
            self.score,
            self.num_comments,
            self.is_self,
            self.retrieved_on,
            self.stickied,
            self.over_18,
            self.spoiler,
            self.locked,
            self.distinguished,
            self.permalink,
            self.has_image,
            self.image_url,
        ])
    }
}

/// One row of `comments`. `link_id`/`parent_id` are weak references and may
/// point at rows that are not (yet) in the store.
#[derive(Clone, Debug, PartialEq)]
pub struct Comment {
    pub id: String,
    pub subreddit: Option<String>,
    pub body: Option<String>,
    pub author: Option<String>,
    pub created_utc: Option<i64>,
    pub score: Option<i64>,
    pub link_id: String,
    pub parent_id: String,
    pub retrieved_on: Option<i64>,
    pub stickied: Option<bool>,
    pub distinguished: Option<String>,
    pub controversiality: Option<i64>,
}

/// Submission id from a `t3_`-prefixed fullname. Ids without the prefix pass through.
pub fn strip_link_prefix(link_id: &str) -> &str {
    link_id.strip_prefix(LINK_PREFIX).unwrap_or(link_id)
}

impl ArchiveRecord for Comment {
    const KIND: &'static str = "comments";
    const UPSERT_SQL: &'static str = UPSERT_COMMENT;

    fn from_json(line: &str) -> Result<Self, ParseError> {
        let f = Fields::parse(line)?;
        Ok(Comment {
            id: f.id()?,
            subreddit: f.text("subreddit"),
            body: f.text("body"),
            author: f.text("author"),
            created_utc: f.int("created_utc"),
            score: f.int("score"),
            link_id: strip_link_prefix(f.text("link_id").as_deref().unwrap_or("")).to_string(),
            parent_id: f.text("parent_id").unwrap_or_default(),
            retrieved_on: f.int("retrieved_on"),
            stickied: f.flag("stickied"),
            distinguished: f.text("distinguished"),
            controversiality: f.int("controversiality"),
        })
    }

    fn bind(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![
            self.id,
            self.subreddit,
            self.body,
            self.author,
            self.created_utc,
            self.score,
            self.link_id,
            self.parent_id,
            self.retrieved_on,
            self.stickied,
            self.distinguished,
            self.controversiality,
        ])
    }
}
