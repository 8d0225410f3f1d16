//! Reading existing feeds and replacing them atomically.

use std::fs::{self, File};
use std::io::Write as _;
use std::path::Path;
use std::sync::LazyLock;

use regex::bytes::Regex as BytesRegex;
use supfeed_core::OutputEncoding;

use crate::error::FeedError;

static DECLARED_ENCODING: LazyLock<BytesRegex> = LazyLock::new(|| {
    BytesRegex::new(r#"^\s*<\?xml[^>]*\bencoding\s*=\s*["']([A-Za-z0-9_-]+)["']"#)
        .expect("valid regex")
});

/// Lines that change on every build even when the catalog does not.
const VOLATILE_PREFIXES: &[&str] = &["<yml_catalog date=", "Built at ", "Next build "];

fn without_volatile_lines(feed: &str) -> Vec<&str> {
    feed.lines()
        .filter(|line| !VOLATILE_PREFIXES.iter().any(|p| line.starts_with(p)))
        .collect()
}

/// Decodes feed bytes, honouring the encoding named in the XML declaration
/// and falling back to `default` when there is none or it is unknown.
#[must_use]
pub fn decode_feed(bytes: &[u8], default: OutputEncoding) -> String {
    let declared = DECLARED_ENCODING
        .captures(bytes)
        .and_then(|c| c.get(1))
        .and_then(|m| std::str::from_utf8(m.as_bytes()).ok())
        .and_then(|label| label.parse::<OutputEncoding>().ok());
    declared.unwrap_or(default).decode(bytes)
}

/// Reads and decodes a feed file.
///
/// # Errors
///
/// Returns [`FeedError::Io`] if the file cannot be read.
pub fn read_feed(path: &Path, default: OutputEncoding) -> Result<String, FeedError> {
    let bytes = fs::read(path).map_err(|e| FeedError::io(path, e))?;
    Ok(decode_feed(&bytes, default))
}

/// Writes `feed` to `path` in `encoding` unless the file already holds the
/// same feed apart from build timestamps.
///
/// The new content goes to a sibling temp file first and is renamed into
/// place, so readers never observe a partial feed. Returns `true` when the
/// file was written.
///
/// # Errors
///
/// Returns [`FeedError::Io`] if reading, writing, or renaming fails.
pub fn write_if_changed(path: &Path, feed: &str, encoding: OutputEncoding) -> Result<bool, FeedError> {
    if path.exists() {
        let existing = read_feed(path, encoding)?;
        if without_volatile_lines(&existing) == without_volatile_lines(feed) {
            tracing::debug!(path = %path.display(), "feed unchanged; skipping write");
            return Ok(false);
        }
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| FeedError::io(parent, e))?;
    }

    let file_name = path
        .file_name()
        .map_or_else(|| "feed".into(), |n| n.to_string_lossy().into_owned());
    let temp_path = path.with_file_name(format!(".{file_name}.tmp"));

    let bytes = encoding.encode(feed);
    let mut file = File::create(&temp_path).map_err(|e| FeedError::io(&temp_path, e))?;
    file.write_all(&bytes)
        .and_then(|()| file.sync_all())
        .map_err(|e| FeedError::io(&temp_path, e))?;
    drop(file);

    fs::rename(&temp_path, path).map_err(|e| FeedError::io(path, e))?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "feed written");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED_V1: &str = "<?xml version=\"1.0\" encoding=\"windows-1251\"?>\n\
<yml_catalog date=\"2026-03-14 01:30\">\n\
<!--FEED_META\n\
Built at                 | 2026-03-14 01:30:05\n\
Next build               | 2026-03-15 01:00:00\n\
-->\n\
<offer id=\"AS1\"><name>Картридж №5</name></offer>\n";

    #[test]
    fn writes_new_file_in_target_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs").join("alstyle.yml");

        assert!(write_if_changed(&path, FEED_V1, OutputEncoding::Windows1251).unwrap());

        let bytes = fs::read(&path).unwrap();
        assert!(!bytes.windows(2).any(|w| w == "К".as_bytes()));
        assert_eq!(decode_feed(&bytes, OutputEncoding::Utf8), FEED_V1);
        assert!(!dir.path().join("docs").join(".alstyle.yml.tmp").exists());
    }

    #[test]
    fn timestamp_only_change_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.yml");
        write_if_changed(&path, FEED_V1, OutputEncoding::Windows1251).unwrap();

        let rebuilt = FEED_V1
            .replace("2026-03-14 01:30:05", "2026-03-15 01:30:09")
            .replace("2026-03-14 01:30\"", "2026-03-15 01:30\"")
            .replace("2026-03-15 01:00:00", "2026-03-16 01:00:00");
        assert!(!write_if_changed(&path, &rebuilt, OutputEncoding::Windows1251).unwrap());
        assert_eq!(read_feed(&path, OutputEncoding::Utf8).unwrap(), FEED_V1);
    }

    #[test]
    fn content_change_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.yml");
        write_if_changed(&path, FEED_V1, OutputEncoding::Windows1251).unwrap();

        let changed = FEED_V1.replace("№5", "№6");
        assert!(write_if_changed(&path, &changed, OutputEncoding::Windows1251).unwrap());
        assert_eq!(read_feed(&path, OutputEncoding::Windows1251).unwrap(), changed);
    }

    #[test]
    fn decode_falls_back_without_declaration() {
        let bytes = OutputEncoding::Windows1251.encode("Бумага");
        assert_eq!(decode_feed(&bytes, OutputEncoding::Windows1251), "Бумага");
        assert_eq!(decode_feed("Бумага".as_bytes(), OutputEncoding::Utf8), "Бумага");
    }

    #[test]
    fn read_feed_missing_file_is_io_error() {
        let err = read_feed(Path::new("/nonexistent/feed.yml"), OutputEncoding::Utf8).unwrap_err();
        assert!(matches!(err, FeedError::Io { .. }));
    }
}
