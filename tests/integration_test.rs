//! End-to-end tests running the scoopfind binary against temporary
//! filesystem sources. Every invocation pins SCOOP and XDG_CONFIG_HOME to a
//! temp directory so the host's scoop installation (if any) stays out of the
//! picture, and always passes --source so no network is touched.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn scoopfind(scoop_root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("scoopfind").unwrap();
    cmd.env("SCOOP", scoop_root)
        .env("XDG_CONFIG_HOME", scoop_root.join("xdg-config"))
        .env_remove("SCOOP_CACHE")
        .env_remove("SCOOP_GLOBAL");
    cmd
}

fn write_bucket(root: &Path, name: &str, manifests: &[(&str, &str)]) -> std::path::PathBuf {
    let dir = root.join(name).join("bucket");
    fs::create_dir_all(&dir).unwrap();
    for (file, body) in manifests {
        fs::write(dir.join(file), body).unwrap();
    }
    root.join(name)
}

#[test]
fn search_by_name_in_directory_bucket() {
    let tmp = TempDir::new().unwrap();
    let bucket = write_bucket(
        tmp.path(),
        "main",
        &[
            ("foo.json", r#"{"version": "1.0", "bin": "foo.exe"}"#),
            ("bar.json", r#"{"version": "2.0", "description": "bar tool"}"#),
        ],
    );

    scoopfind(tmp.path())
        .arg("--source")
        .arg(&bucket)
        .arg("foo")
        .assert()
        .success()
        .stdout(predicate::str::contains("foo (1.0)"))
        .stdout(predicate::str::contains("bar").not())
        .stdout(predicate::str::contains("TOTAL: 1 apps matched"));
}

#[test]
fn name_match_suppresses_binaries_in_output() {
    let tmp = TempDir::new().unwrap();
    let bucket = write_bucket(
        tmp.path(),
        "main",
        &[("foo.json", r#"{"version": "1.0", "bin": "foo.exe"}"#)],
    );

    scoopfind(tmp.path())
        .arg("--source")
        .arg(&bucket)
        .arg("foo")
        .assert()
        .success()
        .stdout(predicate::str::contains("[foo.exe]").not());
}

#[test]
fn binary_only_match_shows_the_binary() {
    let tmp = TempDir::new().unwrap();
    let bucket = write_bucket(
        tmp.path(),
        "main",
        &[("launcher.json", r#"{"version": "1.0", "bin": "tools/qrencode.exe"}"#)],
    );

    scoopfind(tmp.path())
        .arg("--source")
        .arg(&bucket)
        .arg("qrencode")
        .assert()
        .success()
        .stdout(predicate::str::contains("launcher (1.0) [qrencode.exe]"));
}

#[test]
fn zero_matches_exits_nonzero() {
    let tmp = TempDir::new().unwrap();
    let bucket = write_bucket(tmp.path(), "main", &[("foo.json", r#"{"version": "1"}"#)]);

    scoopfind(tmp.path())
        .arg("--source")
        .arg(&bucket)
        .arg("no-such-package")
        .assert()
        .failure()
        .stdout(predicate::str::contains("No matches found."));
}

#[test]
fn html_source_from_local_file() {
    let tmp = TempDir::new().unwrap();
    let page = tmp.path().join("directory.html");
    fs::write(
        &page,
        r#"<a href="https://github.com/org/repo">repo</a>
           <table>
             <tr><th>Name</th><th>Version</th><th>Description</th></tr>
             <tr><td>mytool</td><td>1.2</td><td>does things</td></tr>
           </table>"#,
    )
    .unwrap();

    scoopfind(tmp.path())
        .arg("--source")
        .arg(format!("[html] {}", page.display()))
        .arg("mytool")
        .assert()
        .success()
        .stdout(predicate::str::contains("'https://github.com/org/repo' bucket:"))
        .stdout(predicate::str::contains("mytool (1.2)"));
}

#[test]
fn fallback_source_only_used_when_needed() {
    let tmp = TempDir::new().unwrap();
    let primary = write_bucket(tmp.path(), "a", &[("foo.json", r#"{"version": "1"}"#)]);
    let fallback = write_bucket(tmp.path(), "b", &[("foo-extra.json", r#"{"version": "2"}"#)]);

    // primary matches, so the fallback is not even listed as searched
    scoopfind(tmp.path())
        .arg("--source")
        .arg(&primary)
        .arg("--source")
        .arg(format!("if0: {}", fallback.display()))
        .arg("^foo$")
        .assert()
        .success()
        .stdout(predicate::str::contains("from 1 sources"));

    // nothing in the primary, so the fallback is searched too
    scoopfind(tmp.path())
        .arg("--source")
        .arg(&primary)
        .arg("--source")
        .arg(format!("if0: {}", fallback.display()))
        .arg("foo-extra")
        .assert()
        .success()
        .stdout(predicate::str::contains("from 2 sources"));
}

#[test]
fn merged_output_unions_sources() {
    let tmp = TempDir::new().unwrap();
    let a = write_bucket(tmp.path(), "a", &[("foo.json", r#"{"version": "1"}"#)]);
    let b = write_bucket(tmp.path(), "b", &[("foo-two.json", r#"{"version": "2"}"#)]);

    scoopfind(tmp.path())
        .arg("--merge=true")
        .arg("--source")
        .arg(&a)
        .arg("--source")
        .arg(&b)
        .arg("foo")
        .assert()
        .success()
        .stdout(predicate::str::contains("MERGED RESULTS:"))
        .stdout(predicate::str::contains("foo (1)"))
        .stdout(predicate::str::contains("foo-two (2)"));
}

#[test]
fn malformed_source_spec_is_rejected() {
    let tmp = TempDir::new().unwrap();

    scoopfind(tmp.path())
        .arg("--source")
        .arg("bad:\nspec")
        .arg("anything")
        .assert()
        .failure()
        .stderr(predicate::str::contains("PATTERN"));
}

#[test]
fn invalid_regex_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let bucket = write_bucket(tmp.path(), "main", &[("foo.json", "{}")]);

    scoopfind(tmp.path())
        .arg("--source")
        .arg(&bucket)
        .arg("(unclosed")
        .assert()
        .failure()
        .stderr(predicate::str::contains("search term"));
}
