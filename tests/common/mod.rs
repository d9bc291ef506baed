#![allow(dead_code)]

use serde_json::json;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;

/// Write a compressed `.zst` file containing the provided JSONL lines.
pub fn write_zst_lines(path: &Path, lines: &[String]) {
    write_zst_bytes(path, lines.join("\n").as_bytes());
}

/// Write raw bytes as a single zstd frame (lets tests inject invalid UTF-8).
pub fn write_zst_bytes(path: &Path, bytes: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let f = File::create(path).unwrap();
    let mut enc = zstd::stream::write::Encoder::new(f, 3).unwrap();
    enc.write_all(bytes).unwrap();
    enc.write_all(b"\n").unwrap();
    enc.finish().unwrap();
}

/// Like `write_zst_lines`, but the frame declares a `2^window_log` byte window.
pub fn write_zst_lines_with_window(path: &Path, lines: &[String], window_log: u32) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let f = File::create(path).unwrap();
    let mut enc = zstd::stream::write::Encoder::new(f, 3).unwrap();
    enc.set_parameter(zstd::stream::raw::CParameter::WindowLog(window_log)).unwrap();
    enc.write_all(lines.join("\n").as_bytes()).unwrap();
    enc.write_all(b"\n").unwrap();
    enc.finish().unwrap();
}

pub fn submission_line(id: &str, author: &str) -> String {
    json!({
        "id": id, "author": author, "subreddit": "programming", "title": format!("post {id}"),
        "selftext": "body text", "is_self": true, "created_utc": 1136073600, "score": 3,
        "num_comments": 0, "retrieved_on": 1136075600, "stickied": false, "over_18": false,
        "spoiler": false, "locked": false, "distinguished": null,
        "permalink": format!("/r/programming/comments/{id}/"), "domain": "self.programming",
        "url": format!("https://www.reddit.com/r/programming/comments/{id}/")
    })
    .to_string()
}

pub fn comment_line(id: &str, author: &str, link: &str, parent: &str) -> String {
    json!({
        "id": id, "author": author, "subreddit": "programming", "body": format!("comment {id}"),
        "created_utc": 1136074600, "score": 2, "link_id": link, "parent_id": parent,
        "retrieved_on": 1136075600, "stickied": false, "distinguished": null, "controversiality": 0
    })
    .to_string()
}

/// Build a tiny corpus under `<tmp>/zst_files`:
/// - `programming_submissions.zst`: s1 (bob, image link), s2 (dave, link post), s3 (erin, self post, empty selftext)
/// - `programming_comments.zst`: c1 (alice -> s1), c2 (charlie -> c1), c3 ([deleted] -> s1)
///
/// Returns the input directory.
pub fn make_corpus_basic() -> PathBuf {
    let base = tempfile::tempdir().unwrap().keep();
    let input = base.join("zst_files");

    let rs_lines = vec![
        json!({
            "id": "s1", "author": "bob", "subreddit": "programming", "title": "a picture",
            "selftext": "", "is_self": false, "post_hint": "image", "domain": "i.redd.it",
            "url": "http://i.redd.it/x.jpg", "created_utc": 1136073600, "score": 183,
            "num_comments": 3, "over_18": false, "permalink": "/r/programming/comments/s1/"
        })
        .to_string(),
        json!({
            "id": "s2", "author": "dave", "subreddit": "programming", "title": "Rust news",
            "selftext": "", "is_self": false, "domain": "example.com", "url": "http://example.com",
            "created_utc": 1136073601, "score": 10, "num_comments": 0
        })
        .to_string(),
        json!({
            "id": "s3", "author": "erin", "subreddit": "programming", "title": "Ask: lifetimes?",
            "selftext": "", "is_self": true, "domain": "self.programming",
            "url": "https://www.reddit.com/r/programming/comments/s3/", "created_utc": 1136073602
        })
        .to_string(),
    ];
    write_zst_lines(&input.join("programming_submissions.zst"), &rs_lines);

    let rc_lines = vec![
        comment_line("c1", "alice", "t3_s1", "t3_s1"),
        comment_line("c2", "charlie", "t3_s1", "t1_c1"),
        comment_line("c3", "[deleted]", "t3_s1", "t3_s1"),
    ];
    write_zst_lines(&input.join("programming_comments.zst"), &rc_lines);

    input
}

/// An archive with the right name but plain-text contents (not zstd).
pub fn add_corrupt_archive(input: &Path) {
    let corrupt = input.join("broken_comments.zst");
    let mut f = File::create(corrupt).unwrap();
    writeln!(&mut f, "{{\"id\":\"bad\",\"author\":\"mallory\"}}").unwrap();
}

/// Store path next to the input directory.
pub fn db_path_for(input: &Path) -> PathBuf {
    input.parent().unwrap().join("reddit_data.db")
}

/// A one-connection-per-request HTTP/1.1 stub on 127.0.0.1.
///
/// `respond` gets the request head (request line plus headers) and returns
/// the status code and JSON body. Every request head is kept in `requests`.
pub struct HttpStub {
    pub base: String,
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl HttpStub {
    /// Request lines seen so far whose path starts with `prefix`.
    pub fn hits(&self, prefix: &str) -> usize {
        let needle = format!(" {prefix}");
        self.requests.lock().unwrap().iter().filter(|h| h.lines().next().unwrap_or("").contains(&needle)).count()
    }
}

pub fn serve_http(respond: impl Fn(&str) -> (u16, String) + Send + 'static) -> HttpStub {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = requests.clone();

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut head = String::new();
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap_or(0);
                    }
                }
                head.push_str(&line);
            }
            let mut body = vec![0u8; content_length];
            let _ = reader.read_exact(&mut body);

            let (status, payload) = respond(&head);
            seen.lock().unwrap().push(head);
            let reply = format!(
                "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
                payload.len()
            );
            let _ = stream.write_all(reply.as_bytes());
            let _ = stream.flush();
        }
    });

    HttpStub { base, requests }
}
