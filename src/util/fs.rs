use std::path::Path;

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir_exists(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Write a file, creating parent directories as needed.
pub fn write_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir_exists(parent)?;
    }

    std::fs::write(path, contents).map_err(|e| {
        std::io::Error::new(
            e.kind(),
            format!("Failed to write {}: {}", path.display(), e),
        )
    })
}

/// Turn an arbitrary suite name into a portable file name component.
///
/// Anything outside `[A-Za-z0-9._-]` becomes `_`, runs of `_` collapse and
/// leading/trailing `_` are trimmed.
pub fn sanitize_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '.' | '-') {
            c
        } else {
            '_'
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "suite".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_dir_exists_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_dir_exists(&nested).unwrap();
        assert!(nested.is_dir());
        // Idempotent.
        ensure_dir_exists(&nested).unwrap();
    }

    #[test]
    fn test_write_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.json");
        write_file(&path, b"{}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("api [tests/api.yml]"), "api_tests_api.yml");
        assert_eq!(sanitize_file_name("a  b//c"), "a_b_c");
        assert_eq!(sanitize_file_name("résumé-1"), "r_sum_-1");
        assert_eq!(sanitize_file_name("[]"), "suite");
    }
}
