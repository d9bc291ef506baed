use anyhow::{bail, Result};
use redditdb::{import_all, init_tracing_once, ImportOptions, Store};

fn main() -> Result<()> {
    init_tracing_once();
    let opts = ImportOptions::default();

    if !opts.input_dir.is_dir() {
        bail!(
            "input directory '{}' not found; put *_submissions.zst and *_comments.zst archives there",
            opts.input_dir.display()
        );
    }

    let mut store = Store::open(&opts.db_path)?;
    let summary = import_all(&mut store, &opts)?;

    let sub_count = store.count_rows("submissions")?;
    let com_count = store.count_rows("comments")?;

    println!("IMPORT COMPLETE!");
    println!(
        "Files imported: {}  (failed: {})",
        summary.files_imported, summary.files_failed
    );
    println!(
        "This run: {} submissions ({} errors), {} comments ({} errors)",
        summary.submissions.written, summary.submissions.errors, summary.comments.written, summary.comments.errors
    );
    println!("Total submissions: {sub_count}");
    println!("Total comments: {com_count}");
    println!("Database saved to: {}", opts.db_path.display());
    Ok(())
}
