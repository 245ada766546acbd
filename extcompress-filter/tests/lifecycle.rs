#![cfg(unix)]

use extcompress_filter::{ExtCompressError, FilterDescriptor, FilterRegistry, OperationMode, StreamJob};
use std::io::Read;
use std::process::Command;
use std::thread;
use std::time::{Duration, Instant};

/// A registry whose "decompress" never ends: `yes <path>`.
fn endless_registry() -> FilterRegistry {
    let mut registry = FilterRegistry::empty();
    registry.register("application/x-endless", FilterDescriptor::new("yes"));
    registry
}

fn sleep_for(seconds: &str) -> Command {
    let mut command = Command::new("sleep");
    command.arg(seconds);
    command
}

#[test]
fn test_early_close_does_not_hang() {
    let endless = endless_registry().lookup("application/x-endless").unwrap();
    let start = Instant::now();

    let mut job = endless.decompress("never-ending").unwrap();
    let mut buf = [0u8; 4096];
    job.read_exact(&mut buf).unwrap();
    assert!(buf.starts_with(b"never-ending\n"));

    job.close().unwrap();
    assert!(job.was_forced());
    assert_eq!(job.result().unwrap(), 0);
    assert!(start.elapsed() < Duration::from_secs(10));
}

#[test]
fn test_close_before_any_read() {
    let endless = endless_registry().lookup("application/x-endless").unwrap();
    let mut job = endless.decompress("unread").unwrap();
    job.close().unwrap();
    assert_eq!(job.result().unwrap(), 0);
}

#[test]
fn test_drop_closes_job() {
    let endless = endless_registry().lookup("application/x-endless").unwrap();
    let job = endless.decompress("dropped").unwrap();
    let exit = job.exit_handle();
    drop(job);

    assert!(exit.is_finished());
    assert_eq!(exit.result().unwrap(), 0);
}

#[test]
fn test_concurrent_result_callers_agree() {
    let start = Instant::now();
    let job = StreamJob::spawn(sleep_for("0.3"), None).unwrap();
    let exit = job.exit_handle();

    let (a, b) = thread::scope(|scope| {
        let first = scope.spawn(|| {
            let code = job.result().unwrap();
            (code, start.elapsed())
        });
        let second = scope.spawn(|| {
            let code = exit.result().unwrap();
            (code, start.elapsed())
        });
        (first.join().unwrap(), second.join().unwrap())
    });

    assert_eq!(a.0, 0);
    assert_eq!(a.0, b.0);
    // Neither returned before the process was gone.
    assert!(a.1 >= Duration::from_millis(250));
    assert!(b.1 >= Duration::from_millis(250));
    assert!(job.is_finished());
}

#[test]
fn test_concurrent_result_sees_nonzero_exit() {
    let mut command = Command::new("sh");
    command.args(["-c", "sleep 0.1; exit 7"]);
    let job = StreamJob::spawn(command, None).unwrap();

    let codes: Vec<i32> = thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let exit = job.exit_handle();
                scope.spawn(move || exit.result().unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(codes, [7, 7, 7, 7]);
    assert_eq!(job.result().unwrap(), 7);
}

#[test]
fn test_close_racing_result() {
    let mut job = StreamJob::spawn(sleep_for("30"), None).unwrap();
    let exit = job.exit_handle();
    let start = Instant::now();

    let waiter = thread::spawn(move || exit.result().unwrap());
    // Let the waiter block in wait() before closing.
    thread::sleep(Duration::from_millis(100));
    job.close().unwrap();

    assert_eq!(waiter.join().unwrap(), 0);
    assert_eq!(job.result().unwrap(), 0);
    assert!(start.elapsed() < Duration::from_secs(10));
}

#[test]
fn test_spawn_failure_creates_no_job() {
    let mut registry = FilterRegistry::empty();
    registry.register(
        "application/x-missing",
        FilterDescriptor::unix_filter("extcompress-no-such-program"),
    );
    let filter = registry.lookup("application/x-missing").unwrap();
    match filter.decompress("/tmp/whatever") {
        Err(ExtCompressError::Spawn { program, .. }) => {
            assert_eq!(program, "extcompress-no-such-program");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_stderr_does_not_affect_result() {
    let mut registry = FilterRegistry::empty();
    registry.register(
        "text/x-noisy",
        FilterDescriptor::new("sh").with_args(
            OperationMode::StreamCompress,
            ["-c", "echo warning >&2; cat"],
        ),
    );
    let noisy = registry.lookup("text/x-noisy").unwrap();
    let mut job = noisy.compress_stream(std::io::Cursor::new(b"payload".to_vec())).unwrap();
    let mut out = Vec::new();
    job.read_to_end(&mut out).unwrap();
    assert_eq!(out, b"payload");
    assert_eq!(job.result().unwrap(), 0);
}
