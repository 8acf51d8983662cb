//! File-based rule-list loader.

use std::io::BufReader;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::AsyncReadExt;

use super::{ParseError, RuleFileKind, parser_for_kind};

/// Error type for rule-file loading operations.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// File was not found at the specified path.
    #[error("file not found: {0:?}")]
    NotFound(PathBuf),

    /// Permission denied when accessing the file.
    #[error("permission denied: {0:?}")]
    PermissionDenied(PathBuf),

    /// I/O error while reading the file.
    #[error("I/O error reading {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error parsing the file content.
    #[error("parse error")]
    Parse(#[from] ParseError),

    /// Task join error from spawning a blocking task.
    #[error("task join error")]
    Join(#[from] tokio::task::JoinError),
}

/// Loads rule lists from local files.
pub struct FileLoader;

impl FileLoader {
    /// Load a rule file and return its raw entries.
    ///
    /// The file is read asynchronously; parsing runs in a blocking task
    /// so a large blocklist cannot stall the runtime.
    pub async fn load(path: &Path, kind: RuleFileKind) -> Result<Vec<String>, LoadError> {
        let path_buf = path.to_path_buf();

        let mut file = File::open(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LoadError::NotFound(path_buf.clone()),
            std::io::ErrorKind::PermissionDenied => LoadError::PermissionDenied(path_buf.clone()),
            _ => LoadError::Io {
                path: path_buf.clone(),
                source: e,
            },
        })?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .await
            .map_err(|e| LoadError::Io {
                path: path_buf,
                source: e,
            })?;

        let entries = tokio::task::spawn_blocking(move || {
            let parser = parser_for_kind(kind);
            let mut reader = BufReader::new(content.as_bytes());
            parser.parse(&mut reader)
        })
        .await??;

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn should_load_domain_list_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# ads").unwrap();
        writeln!(file, "doubleclick.net").unwrap();
        writeln!(file, "*.adservice.example").unwrap();
        file.flush().unwrap();

        let entries = FileLoader::load(file.path(), RuleFileKind::Domains)
            .await
            .unwrap();

        assert_eq!(entries, vec!["doubleclick.net", "*.adservice.example"]);
    }

    #[tokio::test]
    async fn should_load_pattern_list_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "^ads\\.").unwrap();
        writeln!(file, "tracker").unwrap();
        file.flush().unwrap();

        let entries = FileLoader::load(file.path(), RuleFileKind::Patterns)
            .await
            .unwrap();

        assert_eq!(entries, vec!["^ads\\.", "tracker"]);
    }

    #[tokio::test]
    async fn should_return_empty_vec_for_empty_file() {
        let file = NamedTempFile::new().unwrap();

        let entries = FileLoader::load(file.path(), RuleFileKind::Domains)
            .await
            .unwrap();

        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn should_return_not_found_error_when_file_does_not_exist() {
        let result = FileLoader::load(
            Path::new("/nonexistent/path/to/rules.txt"),
            RuleFileKind::Domains,
        )
        .await;

        assert!(matches!(result, Err(LoadError::NotFound(_))));
    }

    #[tokio::test]
    async fn should_handle_large_rule_file() {
        let mut file = NamedTempFile::new().unwrap();
        for i in 0..10_000 {
            writeln!(file, "domain{i}.example.com").unwrap();
        }
        file.flush().unwrap();

        let entries = FileLoader::load(file.path(), RuleFileKind::Domains)
            .await
            .unwrap();

        assert_eq!(entries.len(), 10_000);
        assert_eq!(entries[0], "domain0.example.com");
        assert_eq!(entries[9999], "domain9999.example.com");
    }
}
