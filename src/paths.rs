use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

/// Type of archive file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Submission, // *_submissions.zst
    Comment,    // *_comments.zst
}

/// Classify an archive by its file name; anything else is ignored.
pub fn classify(name: &str) -> Option<FileKind> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^.+_(submissions|comments)\.zst$").expect("static regex"));
    let caps = re.captures(name)?;
    match &caps[1] {
        "submissions" => Some(FileKind::Submission),
        _ => Some(FileKind::Comment),
    }
}

/// Archives found under the input directory, each list sorted by path.
#[derive(Debug, Default)]
pub struct Discovered {
    pub submissions: Vec<PathBuf>,
    pub comments: Vec<PathBuf>,
}

/// Walk `dir` recursively and collect submission and comment archives.
pub fn discover_archives(dir: &Path) -> Discovered {
    let mut found = Discovered::default();
    for entry in WalkDir::new(dir).min_depth(1).into_iter().flatten() {
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else { continue };
        match classify(name) {
            Some(FileKind::Submission) => found.submissions.push(entry.path().to_path_buf()),
            Some(FileKind::Comment) => found.comments.push(entry.path().to_path_buf()),
            None => {}
        }
    }
    found.submissions.sort();
    found.comments.sort();
    found
}
