#[path = "common/mod.rs"]
mod common;

use common::*;
use redditdb::{
    enrich_authors, fetch_and_store_users, import_all, EnrichOptions, FailedUserRow, ImportOptions, ProfileError,
    ProfileSource, Store, UserProfile, UserRow, SUSPENDED_OR_NONE,
};
use std::collections::HashSet;
use std::time::Duration;

/// In-memory profile service: names starting with "sus" have no id, names
/// starting with "gone" 404, everything else resolves.
#[derive(Default)]
struct FakeProfiles {
    calls: Vec<String>,
}

impl ProfileSource for FakeProfiles {
    fn fetch_profile(&mut self, username: &str) -> Result<UserProfile, ProfileError> {
        self.calls.push(username.to_string());
        if username.starts_with("gone") {
            return Err(ProfileError::Status(404));
        }
        if username.starts_with("sus") {
            return Ok(UserProfile { is_suspended: true, ..Default::default() });
        }
        Ok(UserProfile {
            id: Some(format!("id_{username}")),
            created_utc: Some(1_136_073_600),
            comment_karma: Some(5),
            link_karma: Some(1),
            is_mod: Some(false),
            profile_name: Some(format!("u_{username}")),
            ..Default::default()
        })
    }
}

fn quiet(batch: usize) -> EnrichOptions {
    EnrichOptions::default().with_batch_size(batch).with_pause(Duration::ZERO).with_progress(false)
}

fn resolved(name: &str) -> UserRow {
    UserRow {
        id: format!("old_{name}"),
        username: name.to_string(),
        created_utc: None,
        comment_karma: None,
        link_karma: None,
        is_mod: None,
        is_suspended: false,
        profile_name: None,
        profile_description: None,
        retrieved_on: 1,
    }
}

fn tombstone(name: &str) -> FailedUserRow {
    FailedUserRow { username: name.to_string(), reason: "earlier".to_string(), retrieved_on: 1 }
}

/// 50 authors, 10 already resolved and 5 already tombstoned: exactly 35 lookups.
#[test]
fn known_usernames_are_not_fetched_again() {
    let mut store = Store::open_in_memory().unwrap();
    let names: Vec<String> = (0..50).map(|i| format!("user{i:02}")).collect();
    let pre_ok: Vec<UserRow> = names[..10].iter().map(|n| resolved(n)).collect();
    let pre_failed: Vec<FailedUserRow> = names[10..15].iter().map(|n| tombstone(n)).collect();
    store.write_user_batch(&pre_ok, &pre_failed).unwrap();

    let mut fake = FakeProfiles::default();
    let stats = fetch_and_store_users(&mut store, &mut fake, &names, &quiet(100)).unwrap();

    assert_eq!(fake.calls.len(), 35);
    assert_eq!(stats.attempted, 35);
    assert_eq!(stats.skipped, 15);
    assert_eq!(stats.added, 35);
    let called: HashSet<&str> = fake.calls.iter().map(String::as_str).collect();
    assert!(!called.contains("user00"));
    assert!(!called.contains("user14"));
    assert!(called.contains("user15"));

    // Earlier tombstones are left alone.
    assert_eq!(store.count_rows("reddit_users").unwrap(), 45);
    assert_eq!(store.count_rows("reddit_users_failed").unwrap(), 5);
}

/// Unresolvable and failing lookups become tombstones with their reasons.
#[test]
fn failures_are_tombstoned_with_reason() {
    let mut store = Store::open_in_memory().unwrap();
    let names = vec!["alice".to_string(), "sus_bot".to_string(), "gone_guy".to_string()];

    let mut fake = FakeProfiles::default();
    let stats = fetch_and_store_users(&mut store, &mut fake, &names, &quiet(100)).unwrap();
    assert_eq!((stats.added, stats.unresolved, stats.errors), (1, 1, 1));
    assert_eq!(stats.batches, 1);

    let reason = |name: &str| -> String {
        store
            .connection()
            .query_row("SELECT reason FROM reddit_users_failed WHERE username = ?1", [name], |r| r.get(0))
            .unwrap()
    };
    assert_eq!(reason("sus_bot"), SUSPENDED_OR_NONE);
    assert_eq!(reason("gone_guy"), ProfileError::Status(404).to_string());

    let (id, profile): (String, Option<String>) = store
        .connection()
        .query_row("SELECT id, profile_name FROM reddit_users WHERE username = 'alice'", [], |r| {
            Ok((r.get(0)?, r.get(1)?))
        })
        .unwrap();
    assert_eq!(id, "id_alice");
    assert_eq!(profile.as_deref(), Some("u_alice"));
}

/// 250 lookups at batch size 100: two full batches plus one final partial batch.
#[test]
fn results_are_committed_in_batches() {
    let mut store = Store::open_in_memory().unwrap();
    let mut names: Vec<String> = (0..240).map(|i| format!("user{i:03}")).collect();
    names.extend((0..10).map(|i| format!("sus{i}")));

    let mut fake = FakeProfiles::default();
    let stats = fetch_and_store_users(&mut store, &mut fake, &names, &quiet(100)).unwrap();
    assert_eq!(stats.batches, 3);
    assert_eq!(stats.added, 240);
    assert_eq!(stats.unresolved, 10);
    assert_eq!(store.count_rows("reddit_users").unwrap(), 240);
    assert_eq!(store.count_rows("reddit_users_failed").unwrap(), 10);

    // Exact multiple of the batch size: no empty trailing commit.
    let mut store = Store::open_in_memory().unwrap();
    let names: Vec<String> = (0..200).map(|i| format!("user{i:03}")).collect();
    let stats = fetch_and_store_users(&mut store, &mut FakeProfiles::default(), &names, &quiet(100)).unwrap();
    assert_eq!(stats.batches, 2);
}

/// A second run over the same store makes no lookups at all.
#[test]
fn rerun_after_completion_is_a_no_op() {
    let mut store = Store::open_in_memory().unwrap();
    let names = vec!["alice".to_string(), "sus_x".to_string(), "gone_y".to_string()];
    fetch_and_store_users(&mut store, &mut FakeProfiles::default(), &names, &quiet(2)).unwrap();

    let mut fake = FakeProfiles::default();
    let stats = fetch_and_store_users(&mut store, &mut fake, &names, &quiet(2)).unwrap();
    assert!(fake.calls.is_empty());
    assert_eq!(stats.skipped, 3);
    assert_eq!(stats.batches, 0);
}

/// Authors come from both content tables, deduplicated, without placeholder accounts.
#[test]
fn authors_are_collected_from_imported_content() {
    let input = make_corpus_basic();
    let opts = ImportOptions::default()
        .with_input_dir(&input)
        .with_db_path(db_path_for(&input))
        .with_progress(false);
    let mut store = Store::open(&opts.db_path).unwrap();
    import_all(&mut store, &opts).unwrap();

    assert_eq!(store.distinct_authors().unwrap(), vec!["alice", "bob", "charlie", "dave", "erin"]);

    let mut fake = FakeProfiles::default();
    let stats = enrich_authors(&mut store, &mut fake, &quiet(100)).unwrap();
    assert_eq!(stats.attempted, 5);
    assert!(!fake.calls.iter().any(|c| c == "[deleted]"));
    assert_eq!(store.count_rows("reddit_users").unwrap(), 5);
}
