//! Integration tests for following a live log file.

use std::io::Write;
use std::time::Duration;

use brawl_tracker::aggregator::JobKind;
use brawl_tracker::ingest::{Ingestor, JobBus, LinePipeline};
use brawl_tracker::watcher::{LogTailer, OffsetStore};
use flate2::write::GzEncoder;
use flate2::Compression;
use futures_util::StreamExt;
use tempfile::TempDir;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

fn append(path: &std::path::Path, text: &str) {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .expect("open log for append");
    file.write_all(text.as_bytes()).expect("append to log");
    file.flush().expect("flush log");
}

/// Test that a restarted tailer continues from the persisted offset.
#[tokio::test]
async fn test_resume_after_restart() {
    let dir = TempDir::new().expect("create temp dir");
    let log = dir.path().join("Player.log");
    let store_path = dir.path().join("state").join("offset");
    append(&log, "first\nsecond\n");

    let mut tailer = LogTailer::resume(&log, OffsetStore::new(&store_path))
        .await
        .expect("resume tailer");
    assert_eq!(
        tailer.read_new_lines().await.expect("read lines"),
        vec!["first", "second"]
    );
    drop(tailer);

    append(&log, "third\n");
    let mut tailer = LogTailer::resume(&log, OffsetStore::new(&store_path))
        .await
        .expect("resume tailer again");
    assert_eq!(tailer.offset(), 13);
    assert_eq!(
        tailer.read_new_lines().await.expect("read lines"),
        vec!["third"]
    );
    assert_eq!(
        OffsetStore::new(&store_path).load().await.expect("load offset"),
        19
    );
}

/// Test that a log replaced by rename is read again from the start.
#[cfg(unix)]
#[tokio::test]
async fn test_rotation_by_rename() {
    let dir = TempDir::new().expect("create temp dir");
    let log = dir.path().join("Player.log");
    append(&log, "old session\n");

    let mut tailer = LogTailer::new(&log);
    assert_eq!(
        tailer.read_new_lines().await.expect("read lines"),
        vec!["old session"]
    );

    let replacement = dir.path().join("Player.log.new");
    append(&replacement, "new session line one\nnew session line two\n");
    std::fs::rename(&replacement, &log).expect("rename over log");

    assert_eq!(
        tailer.read_new_lines().await.expect("read rotated log"),
        vec!["new session line one", "new session line two"]
    );
}

/// Test that a gzip-compressed log is read through the decompressor.
#[tokio::test]
async fn test_gzip_log() {
    let dir = TempDir::new().expect("create temp dir");
    let log = dir.path().join("Player.log.gz");
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(b"[ActionEnterShopPhase] Round:1\n[ActionUpdateTurnTimer] Seconds:30\n")
        .expect("compress");
    std::fs::write(&log, encoder.finish().expect("finish gzip")).expect("write gzip log");

    let mut tailer = LogTailer::new(&log);
    let lines = tailer.read_new_lines().await.expect("read gzip log");
    assert_eq!(lines.len(), 2);
    assert!(tailer.read_new_lines().await.expect("read again").is_empty());
}

/// Test that a compressed log still being written yields its flushed lines.
#[tokio::test]
async fn test_unfinished_gzip_log() {
    let dir = TempDir::new().expect("create temp dir");
    let log = dir.path().join("Player.log.gz");
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(b"[ActionEnterShopPhase] Round:1\n[ActionUpdateTurnTimer] Seconds:30\n")
        .expect("compress");
    encoder.flush().expect("flush gzip");
    std::fs::write(&log, encoder.get_ref()).expect("write gzip log");

    let mut tailer = LogTailer::new(&log);
    let lines = tailer.read_new_lines().await.expect("read unfinished gzip log");
    assert_eq!(
        lines,
        vec!["[ActionEnterShopPhase] Round:1", "[ActionUpdateTurnTimer] Seconds:30"]
    );
    assert!(tailer.read_new_lines().await.expect("read again").is_empty());
}

/// Test that the line stream yields lines written after it started.
#[tokio::test]
async fn test_line_stream_follows_appends() {
    let dir = TempDir::new().expect("create temp dir");
    let log = dir.path().join("Player.log");
    append(&log, "before\n");

    let stream = LogTailer::new(&log).into_line_stream(Duration::from_millis(5));
    tokio::pin!(stream);

    let first = timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("line before timeout")
        .expect("stream open")
        .expect("line read");
    assert_eq!(first, "before");

    append(&log, "after\n");
    let second = timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("line before timeout")
        .expect("stream open")
        .expect("line read");
    assert_eq!(second, "after");
}

/// Test that the ingestor publishes jobs for appended lines and stops on
/// cancellation.
#[tokio::test]
async fn test_ingestor_end_to_end() {
    let dir = TempDir::new().expect("create temp dir");
    let log = dir.path().join("Player.log");
    append(&log, "[ActionConnectionInfo] SessionId:abc BuildId:4211\n");

    let bus = JobBus::default();
    let mut rx = bus.subscribe();
    let ingestor = Ingestor::new(LogTailer::new(&log), LinePipeline::default(), bus)
        .with_poll_interval(Duration::from_millis(5));
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(ingestor.run(cancel.clone()));

    let job = timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("job before timeout")
        .expect("channel open");
    assert_eq!(job.kind(), JobKind::NewGame);

    append(&log, "not a log line\n[ActionEnterShopPhase] Round:1\n");
    let job = timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("job before timeout")
        .expect("channel open");
    assert_eq!(job.kind(), JobKind::RoundInfo);

    cancel.cancel();
    let stats = timeout(Duration::from_secs(2), handle)
        .await
        .expect("ingestor stops")
        .expect("task joins");
    assert_eq!(stats.lines, 3);
    assert_eq!(stats.jobs, 2);
    assert!(rx.recv().await.is_err());
}
