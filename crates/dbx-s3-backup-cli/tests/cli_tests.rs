//! CLI integration tests for dbx-s3-backup.
//!
//! These tests verify argument parsing, help output, and startup-time
//! configuration errors. No storage service is contacted.

use assert_cmd::Command;
use predicates::prelude::*;

/// Get a command for the dbx-s3-backup binary.
fn cmd() -> Command {
    Command::cargo_bin("dbx-s3-backup").unwrap()
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_flags() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--once"))
        .stdout(predicate::str::contains("--env-file"))
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("--verbosity"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dbx-s3-backup"));
}

// =============================================================================
// Configuration Error Tests
// =============================================================================

#[test]
fn test_missing_token_is_fatal_at_startup() {
    cmd()
        .env_clear()
        .arg("--once")
        .assert()
        .failure()
        .stderr(predicate::str::contains("DROPBOX_ACCESS_TOKEN"));
}

#[test]
fn test_missing_bucket_is_fatal_at_startup() {
    cmd()
        .env_clear()
        .env("DROPBOX_ACCESS_TOKEN", "token")
        .arg("--once")
        .assert()
        .failure()
        .stderr(predicate::str::contains("S3_BUCKET"));
}

#[test]
fn test_invalid_batch_size_is_fatal_at_startup() {
    cmd()
        .env_clear()
        .env("DROPBOX_ACCESS_TOKEN", "token")
        .env("S3_BUCKET", "bucket")
        .env("S3_REGION", "us-east-1")
        .env("BACKUP_BATCH_SIZE", "many")
        .arg("--once")
        .assert()
        .failure()
        .stderr(predicate::str::contains("BACKUP_BATCH_SIZE"));
}

#[test]
fn test_unreadable_env_file_is_fatal() {
    cmd()
        .env_clear()
        .args(["--once", "--env-file", "/nonexistent/backup.env"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load"));
}
