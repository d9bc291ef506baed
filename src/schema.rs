//! Table and index definitions. Every statement is `IF NOT EXISTS`, so the
//! whole script can run against a fresh or an existing database.
//!
//! No foreign keys: comments may arrive before the submissions they reply to.

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS submissions (
    id            TEXT PRIMARY KEY,
    subreddit     TEXT,
    title         TEXT,
    selftext      TEXT,
    author        TEXT,
    created_utc   INTEGER,
    score         INTEGER,
    num_comments  INTEGER,
    is_self       BOOLEAN,
    retrieved_on  INTEGER,
    stickied      BOOLEAN,
    over_18       BOOLEAN,
    spoiler       BOOLEAN,
    locked        BOOLEAN,
    distinguished TEXT,
    permalink     TEXT,
    has_image     BOOLEAN,
    image_url     TEXT
);

CREATE TABLE IF NOT EXISTS comments (
    id               TEXT PRIMARY KEY,
    subreddit        TEXT,
    body             TEXT,
    author           TEXT,
    created_utc      INTEGER,
    score            INTEGER,
    link_id          TEXT,
    parent_id        TEXT,
    retrieved_on     INTEGER,
    stickied         BOOLEAN,
    distinguished    TEXT,
    controversiality INTEGER
);

CREATE INDEX IF NOT EXISTS idx_submissions_subreddit ON submissions(subreddit);
CREATE INDEX IF NOT EXISTS idx_submissions_author    ON submissions(author);
CREATE INDEX IF NOT EXISTS idx_submissions_created   ON submissions(created_utc);
CREATE INDEX IF NOT EXISTS idx_comments_subreddit    ON comments(subreddit);
CREATE INDEX IF NOT EXISTS idx_comments_author       ON comments(author);
CREATE INDEX IF NOT EXISTS idx_comments_created      ON comments(created_utc);
CREATE INDEX IF NOT EXISTS idx_comments_link_id      ON comments(link_id);

CREATE TABLE IF NOT EXISTS reddit_users (
    id                  TEXT PRIMARY KEY,
    username            TEXT NOT NULL,
    created_utc         INTEGER,
    comment_karma       INTEGER,
    link_karma          INTEGER,
    is_mod              BOOLEAN,
    is_suspended        BOOLEAN,
    profile_name        TEXT,
    profile_description TEXT,
    retrieved_on        INTEGER
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_reddit_users_username ON reddit_users(username);

CREATE TABLE IF NOT EXISTS reddit_users_failed (
    username     TEXT PRIMARY KEY,
    reason       TEXT,
    retrieved_on INTEGER
);
"#;

pub const UPSERT_SUBMISSION: &str = "INSERT OR REPLACE INTO submissions \
    (id, subreddit, title, selftext, author, created_utc, score, num_comments, is_self, retrieved_on, \
     stickied, over_18, spoiler, locked, distinguished, permalink, has_image, image_url) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)";

pub const UPSERT_COMMENT: &str = "INSERT OR REPLACE INTO comments \
    (id, subreddit, body, author, created_utc, score, link_id, parent_id, retrieved_on, \
     stickied, distinguished, controversiality) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)";

pub const UPSERT_USER: &str = "INSERT OR REPLACE INTO reddit_users \
    (id, username, created_utc, comment_karma, link_karma, is_mod, is_suspended, \
     profile_name, profile_description, retrieved_on) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)";

pub const UPSERT_FAILED_USER: &str = "INSERT OR REPLACE INTO reddit_users_failed \
    (username, reason, retrieved_on) VALUES (?1, ?2, ?3)";

/// Authors that are placeholders rather than real accounts.
pub const PSEUDO_AUTHORS: [&str; 2] = ["[deleted]", "[removed]"];
