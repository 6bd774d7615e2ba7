// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2026 LFSD Contributors

//! git-lfsd end-to-end tests
//!
//! Every test works in a throwaway repository with the in-process delta
//! codec and an isolated HOME, so neither xdelta3 nor the user's Git
//! configuration is involved.

use assert_cmd::Command;
use git2::Repository;
use predicates::prelude::*;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const HELLO_POINTER: &str = "version lfsd@1\noid sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9\nsize 11\n";

struct TestRepo {
    dir: TempDir,
    home: TempDir,
}

impl TestRepo {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();
        Self {
            dir,
            home: TempDir::new().unwrap(),
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn lfsd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("git-lfsd").unwrap();
        cmd.current_dir(self.path())
            .env("HOME", self.home.path())
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .env("LFSD_DELTA_BACKEND", "builtin")
            .env_remove("LFSD_REMOTE_URL")
            .env_remove("LFSD_CACHE_DIR")
            .env_remove("RUST_LOG");
        cmd
    }

    fn git_config(&self, key: &str) -> Option<String> {
        let repo = Repository::open(self.path()).unwrap();
        let config = repo.config().unwrap().open_level(git2::ConfigLevel::Local).unwrap();
        config.get_string(key).ok()
    }

    fn commit(&self, files: &[(&str, &[u8])]) -> git2::Oid {
        let repo = Repository::open(self.path()).unwrap();
        let mut index = repo.index().unwrap();
        for (path, content) in files {
            let file = self.path().join(path);
            std::fs::create_dir_all(file.parent().unwrap()).unwrap();
            std::fs::write(&file, content).unwrap();
            index.add_path(Path::new(path)).unwrap();
        }
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = git2::Signature::now("Test", "test@example.com").unwrap();
        let parents = match repo.head() {
            Ok(head) => vec![head.peel_to_commit().unwrap()],
            Err(_) => Vec::new(),
        };
        let parent_refs: Vec<_> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, "commit", &tree, &parent_refs)
            .unwrap()
    }

    fn clean(&self, path: &str, content: &[u8]) -> Vec<u8> {
        self.lfsd()
            .args(["clean", path])
            .write_stdin(content)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone()
    }
}

fn pkt(text: &str) -> Vec<u8> {
    let mut out = format!("{:04x}", text.len() + 4).into_bytes();
    out.extend_from_slice(text.as_bytes());
    out
}

fn pkt_data(data: &[u8]) -> Vec<u8> {
    let mut out = format!("{:04x}", data.len() + 4).into_bytes();
    out.extend_from_slice(data);
    out
}

const FLUSH: &[u8] = b"0000";

#[test]
fn test_version() {
    let repo = TestRepo::new();
    repo.lfsd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("git-lfsd "));
}

#[test]
fn test_no_command_shows_usage() {
    let repo = TestRepo::new();
    repo.lfsd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_outside_repository_fails() {
    let dir = TempDir::new().unwrap();
    #[allow(deprecated)]
    Command::cargo_bin("git-lfsd")
        .unwrap()
        .current_dir(dir.path())
        .env("GIT_CEILING_DIRECTORIES", dir.path().parent().unwrap())
        .args(["track", "*.psd"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_install_registers_filter() {
    let repo = TestRepo::new();
    repo.lfsd().arg("install").assert().success();

    assert_eq!(
        repo.git_config("filter.lfsd.process").as_deref(),
        Some("git-lfsd filter-process")
    );
    assert_eq!(
        repo.git_config("filter.lfsd.clean").as_deref(),
        Some("git-lfsd clean %f")
    );
    assert_eq!(
        repo.git_config("filter.lfsd.smudge").as_deref(),
        Some("git-lfsd smudge %f")
    );
    assert_eq!(repo.git_config("filter.lfsd.required").as_deref(), Some("true"));

    repo.lfsd().arg("uninstall").assert().success();
    assert_eq!(repo.git_config("filter.lfsd.process"), None);
}

#[test]
fn test_track_list_and_untrack() {
    let repo = TestRepo::new();
    repo.lfsd()
        .args(["track", "*.psd", "*.mp4"])
        .assert()
        .success();

    let attributes = std::fs::read_to_string(repo.path().join(".gitattributes")).unwrap();
    assert_eq!(
        attributes,
        "*.psd filter=lfsd diff=lfsd merge=lfsd -text\n*.mp4 filter=lfsd diff=lfsd merge=lfsd -text\n"
    );

    repo.lfsd()
        .arg("track")
        .assert()
        .success()
        .stdout(predicate::str::contains("*.psd").and(predicate::str::contains("*.mp4")));

    repo.lfsd().args(["untrack", "*.mp4"]).assert().success();
    let attributes = std::fs::read_to_string(repo.path().join(".gitattributes")).unwrap();
    assert_eq!(attributes, "*.psd filter=lfsd diff=lfsd merge=lfsd -text\n");
}

#[test]
fn test_untrack_requires_pattern() {
    let repo = TestRepo::new();
    repo.lfsd().arg("untrack").assert().failure();
}

#[test]
fn test_server_show_and_set() {
    let repo = TestRepo::new();
    repo.lfsd()
        .arg("server")
        .assert()
        .success()
        .stderr(predicate::str::contains("no server found"));

    repo.lfsd()
        .args(["server", "http://blobs.example.com:3000"])
        .assert()
        .success();
    assert_eq!(
        repo.git_config("lfsd.url").as_deref(),
        Some("http://blobs.example.com:3000")
    );

    repo.lfsd()
        .arg("server")
        .assert()
        .success()
        .stdout("http://blobs.example.com:3000\n");
}

#[test]
fn test_server_rejects_non_http_url() {
    let repo = TestRepo::new();
    repo.lfsd()
        .args(["server", "ftp://example.com"])
        .assert()
        .failure();
}

#[test]
fn test_clean_and_smudge() {
    let repo = TestRepo::new();
    let pointer = repo.clean("a.txt", b"hello world");
    assert_eq!(String::from_utf8(pointer.clone()).unwrap(), HELLO_POINTER);
    assert!(repo
        .path()
        .join(".git/lfsd/objects/b9/4d/b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9")
        .exists());

    repo.lfsd()
        .args(["smudge", "a.txt"])
        .write_stdin(pointer)
        .assert()
        .success()
        .stdout("hello world");
}

fn draft(label: &str) -> Vec<u8> {
    let mut content: Vec<u8> = (0..32 * 1024u32).map(|i| (i * 31 % 251) as u8).collect();
    content.extend_from_slice(label.as_bytes());
    content
}

#[test]
fn test_clean_demotes_committed_version() {
    let repo = TestRepo::new();
    let first = draft("first draft");
    let v1 = repo.clean("a.bin", &first);
    repo.commit(&[("a.bin", &v1[..])]);

    let v2 = repo.clean("a.bin", &draft("second draft"));
    let v1_oid = std::str::from_utf8(&v1).unwrap().lines().nth(1).unwrap()[11..].to_string();
    let v1_file = repo
        .path()
        .join(".git/lfsd/objects")
        .join(&v1_oid[..2])
        .join(&v1_oid[2..4])
        .join(&v1_oid);

    // 'S ' followed by the oid of the version that replaced it
    let stored = std::fs::read(&v1_file).unwrap();
    let v2_oid = std::str::from_utf8(&v2).unwrap().lines().nth(1).unwrap()[11..].to_string();
    assert_eq!(&stored[..2], b"S ");
    assert_eq!(std::str::from_utf8(&stored[2..66]).unwrap(), v2_oid);
    assert!(stored.len() < first.len() / 10);

    repo.lfsd()
        .args(["smudge", "a.bin"])
        .write_stdin(v1)
        .assert()
        .success()
        .stdout(first);
}

#[test]
fn test_smudge_rejects_non_pointer() {
    let repo = TestRepo::new();
    repo.lfsd()
        .args(["smudge", "a.txt"])
        .write_stdin("not a pointer")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_filter_process_session() {
    let repo = TestRepo::new();
    let mut input = Vec::new();
    input.extend(pkt("git-filter-client\n"));
    input.extend(pkt("version=2\n"));
    input.extend_from_slice(FLUSH);
    input.extend(pkt("capability=clean\n"));
    input.extend(pkt("capability=smudge\n"));
    input.extend_from_slice(FLUSH);
    input.extend(pkt("command=clean\n"));
    input.extend(pkt("pathname=a.txt\n"));
    input.extend_from_slice(FLUSH);
    input.extend(pkt_data(b"hello world"));
    input.extend_from_slice(FLUSH);

    let mut expected = Vec::new();
    expected.extend(pkt("git-filter-server\n"));
    expected.extend(pkt("version=2\n"));
    expected.extend_from_slice(FLUSH);
    expected.extend(pkt("capability=clean\n"));
    expected.extend(pkt("capability=smudge\n"));
    expected.extend_from_slice(FLUSH);
    expected.extend(pkt("status=success\n"));
    expected.extend_from_slice(FLUSH);
    expected.extend(pkt_data(HELLO_POINTER.as_bytes()));
    expected.extend_from_slice(FLUSH);
    expected.extend_from_slice(FLUSH);

    repo.lfsd()
        .arg("filter-process")
        .write_stdin(input)
        .assert()
        .success()
        .stdout(expected);
}

#[test]
fn test_filter_process_protocol_violation_fails() {
    let repo = TestRepo::new();
    let mut input = pkt("git-filter-client\n");
    input.extend(pkt("version=3\n"));

    repo.lfsd()
        .arg("filter-process")
        .write_stdin(input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("protocol violation"));
}

#[test]
fn test_cat_object_by_prefix() {
    let repo = TestRepo::new();
    repo.clean("a.txt", b"hello world");

    repo.lfsd()
        .args(["cat-object", "b94d27b9"])
        .assert()
        .success()
        .stdout("hello world");
}

#[test]
fn test_cat_object_lists_ambiguous_prefix() {
    let repo = TestRepo::new();
    repo.clean("a.txt", b"hello world");
    // Second object under the same shard and prefix
    let shard = repo.path().join(".git/lfsd/objects/b9/4d");
    let twin = format!("b94d27b9{}", "0".repeat(56));
    let header = format!("S {}\n", "0".repeat(64));
    std::fs::write(shard.join(twin), format!("{}x", header)).unwrap();

    repo.lfsd()
        .args(["cat-object", "b94d27"])
        .assert()
        .success()
        .stdout(predicate::str::contains("more than one"));
}

#[test]
fn test_cat_object_rejects_short_prefix() {
    let repo = TestRepo::new();
    repo.lfsd()
        .args(["cat-object", "b94d2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 6"));
}

#[test]
fn test_cat_object_offline_miss() {
    let repo = TestRepo::new();
    repo.lfsd()
        .args(["cat-object", "--offline", "abcdef"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No object with prefix abcdef"));
}

#[test]
fn test_ls_files() {
    let repo = TestRepo::new();
    repo.lfsd().args(["track", "*.psd"]).assert().success();
    let pointer = repo.clean("art/cover.psd", b"hello world");
    let attributes = std::fs::read(repo.path().join(".gitattributes")).unwrap();
    repo.commit(&[
        (".gitattributes", &attributes[..]),
        ("art/cover.psd", &pointer[..]),
        ("notes.txt", &b"plain"[..]),
    ]);

    repo.lfsd()
        .arg("ls-files")
        .assert()
        .success()
        .stdout("b94d27b993 * art/cover.psd\n");

    repo.lfsd()
        .args(["ls-files", "--long", "--size"])
        .assert()
        .success()
        .stdout(
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9 * art/cover.psd (11 B)\n",
        );

    repo.lfsd()
        .args(["ls-files", "--debug"])
        .assert()
        .success()
        .stdout(predicate::str::contains("filepath").and(predicate::str::contains("lfsd@1")));
}

#[test]
fn test_ls_files_marks_missing_objects() {
    let repo = TestRepo::new();
    repo.lfsd().args(["track", "*.bin"]).assert().success();
    let attributes = std::fs::read(repo.path().join(".gitattributes")).unwrap();
    repo.commit(&[
        (".gitattributes", &attributes[..]),
        ("data.bin", HELLO_POINTER.as_bytes()),
    ]);

    repo.lfsd()
        .arg("ls-files")
        .assert()
        .success()
        .stdout("b94d27b993 - data.bin\n");
}

#[test]
fn test_pre_push_ignores_deletions() {
    let repo = TestRepo::new();
    repo.lfsd()
        .args(["pre-push", "origin", "https://example.com/repo.git"])
        .write_stdin(
            "refs/heads/old 0000000000000000000000000000000000000000 refs/heads/old 1111111111111111111111111111111111111111\n",
        )
        .assert()
        .success()
        .stdout("");
}

#[test]
fn test_pre_push_without_tracked_files_uploads_nothing() {
    let repo = TestRepo::new();
    let head = repo.commit(&[("readme.md", &b"# hi"[..])]);
    repo.lfsd()
        .args(["pre-push", "origin", "https://example.com/repo.git"])
        .write_stdin(format!(
            "refs/heads/main {} refs/heads/main 0000000000000000000000000000000000000000\n",
            head
        ))
        .assert()
        .success()
        .stdout("");
}

/// Blob server answering `not-exist` with `missing` and accepting uploads
///
/// Returns its base URL and the request lines and bodies it received.
fn blob_server(missing: String) -> (String, Arc<Mutex<Vec<(String, Vec<u8>)>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { return };
            let (line, body) = read_request(&mut stream);
            let reply = if line.starts_with("POST /not-exist ") {
                missing.clone()
            } else {
                "{}".to_string()
            };
            log.lock().unwrap().push((line, body));
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                reply.len(),
                reply
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });
    (url, seen)
}

fn read_request(stream: &mut TcpStream) -> (String, Vec<u8>) {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    let head_end = loop {
        let n = stream.read(&mut buf).unwrap();
        data.extend_from_slice(&buf[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        assert!(n > 0, "connection closed before headers");
    };

    let head = String::from_utf8_lossy(&data[..head_end]).to_lowercase();
    let length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .map(|v| v.trim().parse::<usize>().unwrap());
    let chunked = head.contains("transfer-encoding: chunked");
    loop {
        let body = &data[head_end..];
        let complete = match length {
            Some(len) => body.len() >= len,
            None if chunked => body.ends_with(b"0\r\n\r\n"),
            None => true,
        };
        if complete {
            break;
        }
        let n = stream.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
    }

    let line = head.lines().next().unwrap_or_default().to_uppercase();
    (line, data[head_end..].to_vec())
}

#[test]
fn test_pre_push_uploads_missing_objects() {
    let repo = TestRepo::new();
    repo.lfsd().args(["track", "*.bin"]).assert().success();
    let content = draft("pushed");
    let pointer = repo.clean("big.bin", &content);
    let head = repo.commit(&[
        (".gitattributes", &std::fs::read(repo.path().join(".gitattributes")).unwrap()[..]),
        ("big.bin", &pointer[..]),
    ]);

    let oid = std::str::from_utf8(&pointer).unwrap().lines().nth(1).unwrap()[11..].to_string();
    let server_path = format!("{}/{}/{}", &oid[..2], &oid[2..4], oid);
    let (url, seen) = blob_server(format!("[\"{}\"]", server_path));
    repo.lfsd().args(["server", &url]).assert().success();

    repo.lfsd()
        .args(["-q", "pre-push", "origin", "https://example.com/repo.git"])
        .write_stdin(format!(
            "refs/heads/main {} refs/heads/main 0000000000000000000000000000000000000000\n",
            head
        ))
        .assert()
        .success()
        .stdout(predicate::str::contains("LFSD: objects to upload: 1"))
        .stdout(predicate::str::contains("LFSD: uploaded 1 objects"));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen[0].0.starts_with("POST /NOT-EXIST "));
    assert!(String::from_utf8_lossy(&seen[0].1).contains(&server_path));
    assert!(seen[1].0.starts_with("POST /UPLOAD "));
    let upload = &seen[1].1;
    assert!(upload.windows(server_path.len()).any(|w| w == server_path.as_bytes()));
    let whole_header = format!("S {}\n", "0".repeat(64));
    assert!(upload
        .windows(whole_header.len())
        .any(|w| w == whole_header.as_bytes()));
}

#[test]
fn test_pre_push_reports_already_uploaded() {
    let repo = TestRepo::new();
    repo.lfsd().args(["track", "*.bin"]).assert().success();
    let pointer = repo.clean("big.bin", &draft("pushed"));
    let head = repo.commit(&[
        (".gitattributes", &std::fs::read(repo.path().join(".gitattributes")).unwrap()[..]),
        ("big.bin", &pointer[..]),
    ]);

    let (url, seen) = blob_server("[]".to_string());
    repo.lfsd().args(["server", &url]).assert().success();

    repo.lfsd()
        .args(["pre-push", "origin", "https://example.com/repo.git"])
        .write_stdin(format!(
            "refs/heads/main {} refs/heads/main 0000000000000000000000000000000000000000\n",
            head
        ))
        .assert()
        .success()
        .stdout(predicate::str::contains("LFSD: all objects have already been uploaded"));

    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn test_completions() {
    let repo = TestRepo::new();
    repo.lfsd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("git-lfsd"));
}
