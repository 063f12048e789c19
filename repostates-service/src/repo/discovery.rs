// Repository Discovery
// Finds git working trees directly below a root directory

use crate::error::{ServiceError, ServiceResult};
use crate::repo::models::Repository;

use regex::Regex;
use std::path::Path;

/// Whether `path` is the top of a git working tree.
///
/// Accepts both a `.git` directory and a `.git` file (worktrees and
/// submodules use a file pointing at the real git dir).
pub fn is_git_repo(path: &Path) -> bool {
    path.join(".git").exists()
}

/// List the git repositories that are immediate children of `root`.
///
/// When `pattern` is given, only directories whose name contains a match
/// for the regex are kept. The result is sorted by name, which is the
/// order every later stage preserves.
pub fn discover(root: &Path, pattern: Option<&str>) -> ServiceResult<Vec<Repository>> {
    let filter = pattern
        .map(|p| {
            Regex::new(p).map_err(|source| ServiceError::InvalidPattern {
                pattern: p.to_string(),
                source,
            })
        })
        .transpose()?;

    let entries = std::fs::read_dir(root).map_err(|e| ServiceError::io(root, e))?;

    let mut repositories = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ServiceError::io(root, e))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(regex) = &filter {
            if !regex.is_match(&name) {
                tracing::trace!("Skipping {}: does not match filter", name);
                continue;
            }
        }

        if !is_git_repo(&path) {
            tracing::trace!("Skipping {}: not a git repository", name);
            continue;
        }

        repositories.push(Repository::new(name, path));
    }

    repositories.sort_by(|a, b| a.name.cmp(&b.name));
    tracing::debug!(
        "Discovered {} repositories in {}",
        repositories.len(),
        root.display()
    );
    Ok(repositories)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    fn make_tree(names: &[(&str, bool)]) -> tempfile::TempDir {
        let temp = tempfile::tempdir().unwrap();
        for (name, is_repo) in names {
            let dir = temp.path().join(name);
            fs::create_dir(&dir).unwrap();
            if *is_repo {
                fs::create_dir(dir.join(".git")).unwrap();
            }
        }
        temp
    }

    #[test]
    fn test_discover_only_git_directories() {
        let temp = make_tree(&[
            ("frontend_repo", true),
            ("backend_repo", true),
            ("notes", false),
        ]);
        fs::write(temp.path().join("README.md"), "not a dir").unwrap();

        let repos = discover(temp.path(), None).unwrap();

        let names: Vec<_> = repos.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["backend_repo", "frontend_repo"]);
        assert_eq!(repos[0].path, temp.path().join("backend_repo"));
    }

    #[test]
    fn test_discover_with_regex_filter() {
        let temp = make_tree(&[("designs", true), ("documentation", true), ("api", true)]);

        let repos = discover(temp.path(), Some("designs|documentation")).unwrap();

        let names: Vec<_> = repos.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["designs", "documentation"]);
    }

    #[test]
    fn test_discover_regex_searches_anywhere_in_name() {
        let temp = make_tree(&[("service-auth", true), ("web", true)]);

        let repos = discover(temp.path(), Some("auth")).unwrap();

        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].name, "service-auth");
    }

    #[test]
    fn test_discover_accepts_git_file() {
        let temp = make_tree(&[("worktree", false)]);
        fs::write(temp.path().join("worktree").join(".git"), "gitdir: ../x").unwrap();

        let repos = discover(temp.path(), None).unwrap();
        assert_eq!(repos.len(), 1);
    }

    #[test]
    fn test_discover_invalid_regex() {
        let temp = make_tree(&[]);
        let err = discover(temp.path(), Some("(unclosed")).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidPattern { .. }));
    }

    #[test]
    fn test_discover_missing_root() {
        let temp = tempfile::tempdir().unwrap();
        let err = discover(&temp.path().join("nope"), None).unwrap_err();
        assert!(matches!(err, ServiceError::Io { .. }));
    }

    #[test]
    fn test_discover_empty_root() {
        let temp = make_tree(&[("plain", false)]);
        assert!(discover(temp.path(), None).unwrap().is_empty());
    }
}
