#![cfg(unix)]

use extcompress_filter::{ContentTypeResolver, FilterRegistry};
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

const DATA: &str = "\nthis is some non-random data we'll feed to an external compression function.\n";
const SRC_TEXT: &[u8] = b"this is some text\n";

fn have(program: &str) -> bool {
    let found = which::which(program).is_ok();
    if !found {
        eprintln!("skipping: '{}' not found in PATH", program);
    }
    found
}

fn setup_test_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("pipechaining"), DATA).unwrap();
    dir
}

/// The single file in `dir` whose name starts with `base`'s name.
fn glob_match(base: &Path) -> PathBuf {
    let dir = base.parent().unwrap();
    let stem = base.file_name().unwrap().to_string_lossy().into_owned();
    let mut matches: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| {
            path.file_name()
                .is_some_and(|name| name.to_string_lossy().starts_with(&stem))
        })
        .collect();
    assert_eq!(matches.len(), 1, "expected one match for {}", base.display());
    matches.remove(0)
}

#[test]
fn test_pipe_chaining() {
    if !have("bzip2") {
        return;
    }
    let dir = setup_test_dir();
    let source = dir.path().join("pipechaining");
    let registry = FilterRegistry::with_defaults();

    let text = registry.lookup("text/plain").unwrap();
    let bzip2 = registry.lookup("application/x-bzip2").unwrap();

    let start = text.decompress(&source).unwrap();
    let start_exit = start.exit_handle();
    let mut chained = bzip2.compress_stream(start).unwrap();

    let mut output = Vec::new();
    chained.read_to_end(&mut output).unwrap();
    chained.close().unwrap();

    assert_eq!(start_exit.result().unwrap(), 0);
    assert_eq!(chained.result().unwrap(), 0);

    // Same bytes as compressing the file directly.
    let mut direct = bzip2.compress(&source).unwrap();
    let mut expected = Vec::new();
    direct.read_to_end(&mut expected).unwrap();
    assert_eq!(direct.result().unwrap(), 0);
    assert_eq!(output, expected);
}

#[test]
fn test_passthrough_round_trip() {
    let registry = FilterRegistry::with_defaults();
    let cat = registry.lookup("text/plain").unwrap();

    for payload in [Vec::new(), b"short".to_vec(), (0..=255u8).cycle().take(1 << 20).collect()] {
        let compressed = cat.compress_stream(Cursor::new(payload.clone())).unwrap();
        let compressed_exit = compressed.exit_handle();
        let mut restored = cat.decompress_stream(compressed).unwrap();

        let mut out = Vec::new();
        restored.read_to_end(&mut out).unwrap();
        assert_eq!(out, payload);
        assert_eq!(restored.result().unwrap(), 0);
        assert_eq!(compressed_exit.result().unwrap(), 0);
    }
}

#[test]
fn test_mime_handler_mappings() {
    let registry = FilterRegistry::with_defaults();
    registry
        .iter()
        .filter(|(_, descriptor)| !have(descriptor.program()))
        .for_each(|(content_type, _)| eprintln!("  ({} not exercised)", content_type));

    let resolver = ContentTypeResolver::start().unwrap();

    for content_type in registry.content_types() {
        let handler = registry.lookup(content_type).unwrap();
        if which::which(handler.descriptor().program()).is_err() {
            continue;
        }
        eprintln!("Checking {}", content_type);
        assert_eq!(handler.content_type(), content_type);

        // Pass-through output is just text again.
        let expected_type = if handler.descriptor().program() == "cat" {
            "text/plain"
        } else {
            content_type
        };

        let dir = tempfile::tempdir().unwrap();
        let filename = dir.path().join(content_type.replace('/', "_"));

        // Stream compression into a file
        let mut compressed = handler.compress_stream(Cursor::new(SRC_TEXT.to_vec())).unwrap();
        let mut bytes = Vec::new();
        compressed.read_to_end(&mut bytes).unwrap();
        assert_eq!(compressed.result().unwrap(), 0);
        fs::write(&filename, &bytes).unwrap();

        let detected = resolver.handler_for(&registry, &filename).unwrap();
        assert_eq!(detected.content_type(), expected_type);

        // Streaming decompression from the file
        let mut decompressed = handler.decompress(&filename).unwrap();
        let mut restored = Vec::new();
        decompressed.read_to_end(&mut restored).unwrap();
        assert_eq!(restored, SRC_TEXT);
        assert_eq!(decompressed.result().unwrap(), 0);

        // In-place compression
        fs::write(&filename, SRC_TEXT).unwrap();
        handler.compress_file_in_place(&filename).unwrap();
        let mutated = glob_match(&filename);
        let in_place = resolver.handler_for(&registry, &mutated).unwrap();
        assert_eq!(in_place.content_type(), expected_type);

        // In-place decompression restores the original name and bytes
        handler.decompress_file_in_place(&mutated).unwrap();
        let restored = resolver.handler_for(&registry, &filename).unwrap();
        assert_eq!(restored.content_type(), "text/plain");
        assert_eq!(fs::read(&filename).unwrap(), SRC_TEXT);
    }
}

#[test]
fn test_bzip2_in_place_end_to_end() {
    if !have("bzip2") {
        return;
    }
    let registry = FilterRegistry::with_defaults();
    let resolver = ContentTypeResolver::start().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes");
    fs::write(&path, SRC_TEXT).unwrap();

    let bzip2 = registry.lookup("application/x-bzip2").unwrap();
    bzip2.compress_file_in_place(&path).unwrap();

    let compressed = dir.path().join("notes.bz2");
    assert!(!path.exists());
    assert_eq!(resolver.classify(&compressed).unwrap(), "application/x-bzip2");

    let handler = resolver.handler_for(&registry, &compressed).unwrap();
    handler.decompress_file_in_place(&compressed).unwrap();

    assert_eq!(resolver.classify(&path).unwrap(), "text/plain");
    assert_eq!(fs::read(&path).unwrap(), SRC_TEXT);
}

#[test]
fn test_in_place_failure_is_an_error() {
    if !have("gzip") {
        return;
    }
    let registry = FilterRegistry::with_defaults();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain.gz");
    fs::write(&path, SRC_TEXT).unwrap();

    let gzip = registry.lookup("application/gzip").unwrap();
    let err = gzip.decompress_file_in_place(&path).unwrap_err();
    assert!(err.to_string().contains("gzip"));
    assert_eq!(fs::read(&path).unwrap(), SRC_TEXT);
}

#[test]
fn test_unknown_type_has_no_handler() {
    let registry = FilterRegistry::with_defaults();
    assert!(registry.lookup("application/x-totally-unknown").is_err());
}
