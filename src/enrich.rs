//! Author profile enrichment.
//!
//! Each username moves `pending -> resolved | unresolved` exactly once. Anything
//! already in `reddit_users` or `reddit_users_failed` is skipped, so a run can be
//! killed and restarted at any point; clearing a tombstone is the only way to
//! retry a username.

use crate::config::EnrichOptions;
use crate::profile::ProfileSource;
use crate::progress::make_count_progress;
use crate::store::{FailedUserRow, Store, UserRow};
use crate::util::now_unix;
use anyhow::Result;
use std::thread::sleep;

/// Tombstone reason for accounts the API knows but will not resolve.
pub const SUSPENDED_OR_NONE: &str = "suspended_or_none";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnrichStats {
    /// Usernames handed to the loop.
    pub candidates: usize,
    /// Already resolved or tombstoned by an earlier run.
    pub skipped: usize,
    /// Lookups actually made.
    pub attempted: usize,
    pub added: usize,
    /// Lookups that returned no id.
    pub unresolved: usize,
    /// Lookups that failed outright.
    pub errors: usize,
    /// Transactions committed.
    pub batches: usize,
}

#[derive(Default)]
struct Pending {
    resolved: Vec<UserRow>,
    failed: Vec<FailedUserRow>,
    added: usize,
    unresolved: usize,
    errors: usize,
}

impl Pending {
    fn len(&self) -> usize {
        self.resolved.len() + self.failed.len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Commit and reset. Returns the per-batch counters for logging.
    fn commit(&mut self, store: &mut Store) -> Result<(usize, usize, usize)> {
        store.write_user_batch(&self.resolved, &self.failed)?;
        let counts = (self.added, self.unresolved, self.errors);
        *self = Pending::default();
        Ok(counts)
    }
}

/// Look up every username not already in a terminal state and store the result.
///
/// Lookups happen in the order given. Lookup failures become tombstones and
/// never stop the loop; only store failures return `Err`.
pub fn fetch_and_store_users<P: ProfileSource + ?Sized>(
    store: &mut Store,
    source: &mut P,
    usernames: &[String],
    opts: &EnrichOptions,
) -> Result<EnrichStats> {
    let done = store.resolved_usernames()?;
    let to_fetch: Vec<&String> = usernames.iter().filter(|u| !done.contains(u.as_str())).collect();

    let mut stats = EnrichStats {
        candidates: usernames.len(),
        skipped: usernames.len() - to_fetch.len(),
        ..Default::default()
    };
    if stats.skipped > 0 {
        tracing::info!("Skipped {} users already in DB or failed previously.", stats.skipped);
    }

    let batch_size = opts.batch_size.max(1);
    let pb = make_count_progress(opts.progress, to_fetch.len() as u64, "Fetching users");
    let mut pending = Pending::default();

    for username in to_fetch {
        stats.attempted += 1;
        match source.fetch_profile(username) {
            Ok(profile) => match profile.id {
                Some(id) => {
                    pending.resolved.push(UserRow {
                        id,
                        username: username.clone(),
                        created_utc: profile.created_utc,
                        comment_karma: profile.comment_karma,
                        link_karma: profile.link_karma,
                        is_mod: profile.is_mod,
                        is_suspended: profile.is_suspended,
                        profile_name: profile.profile_name,
                        profile_description: profile.profile_description,
                        retrieved_on: now_unix(),
                    });
                    pending.added += 1;
                }
                None => {
                    pending.failed.push(FailedUserRow {
                        username: username.clone(),
                        reason: SUSPENDED_OR_NONE.to_string(),
                        retrieved_on: now_unix(),
                    });
                    pending.unresolved += 1;
                }
            },
            Err(e) => {
                tracing::debug!("lookup of {username} failed: {e}");
                pending.failed.push(FailedUserRow {
                    username: username.clone(),
                    reason: e.to_string(),
                    retrieved_on: now_unix(),
                });
                pending.errors += 1;
            }
        }
        pb.inc(1);

        if pending.len() >= batch_size {
            let (added, skipped, errors) = pending.commit(store)?;
            stats.batches += 1;
            stats.added += added;
            stats.unresolved += skipped;
            stats.errors += errors;
            tracing::info!("Batch {}: Added {added}, Skipped {skipped}, Errors {errors}", stats.batches);
            sleep(opts.pause);
        }
    }

    if !pending.is_empty() {
        let (added, skipped, errors) = pending.commit(store)?;
        stats.batches += 1;
        stats.added += added;
        stats.unresolved += skipped;
        stats.errors += errors;
        tracing::info!("Final Batch {}: Added {added}, Skipped {skipped}, Errors {errors}", stats.batches);
    }
    pb.finish_and_clear();
    Ok(stats)
}

/// Enrich every distinct author referenced by imported content.
pub fn enrich_authors<P: ProfileSource + ?Sized>(
    store: &mut Store,
    source: &mut P,
    opts: &EnrichOptions,
) -> Result<EnrichStats> {
    let usernames = store.distinct_authors()?;
    tracing::info!("Found {} unique users.", usernames.len());
    fetch_and_store_users(store, source, &usernames, opts)
}
