use anyhow::Result;
use redditdb::{enrich_authors, init_tracing_once, EnrichOptions, RedditClient, RedditCredentials, RetryPolicy, Store};

fn main() -> Result<()> {
    init_tracing_once();
    let creds = RedditCredentials::from_env()?;
    let opts = EnrichOptions::default();

    let mut store = Store::open_existing(&opts.db_path)?;
    let mut client = RedditClient::connect(creds, RetryPolicy::default())?;

    let stats = enrich_authors(&mut store, &mut client, &opts)?;

    println!(
        "Looked up {} users: {} added, {} suspended or missing, {} errors ({} skipped from earlier runs)",
        stats.attempted, stats.added, stats.unresolved, stats.errors, stats.skipped
    );
    println!("All user data fetched and stored.");
    Ok(())
}
