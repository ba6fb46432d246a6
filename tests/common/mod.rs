use std::io::Write;

/// Write `contents` to a fresh temp file with the given suffix.
///
/// The suffix matters: the sequence loader picks TOML or JSON by extension.
#[allow(dead_code)]
pub fn temp_file(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file
}
