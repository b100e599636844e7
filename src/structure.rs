//! Project tree snapshot.
//!
//! The tree mirrors the project on disk, minus hidden entries, ignored paths
//! and well-known build or dependency directories. Directories that end up
//! with no children are dropped.

use crate::error::{Error, Result};
use crate::file::Candidate;
use crate::filter::IgnorePatterns;
use crate::scanner::relative_path;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{trace, warn};
use walkdir::WalkDir;

/// Directory names that never appear in the tree.
const JUNK_DIRS: &[&str] = &[
    "__pycache__",
    "venv",
    ".venv",
    "node_modules",
    ".git",
    "dist",
    "build",
    "eggs",
    "site-packages",
    "target",
];

/// Extensions of compiled artifacts that never appear in the tree.
const JUNK_EXTENSIONS: &[&str] = &["pyc", "pyo", "pyd", "so", "dll", "exe"];

/// Hidden entries that are still listed.
const VISIBLE_DOTFILES: &[&str] = &[".ignore"];

/// Whether a tree node is a directory or a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Has children
    Directory,
    /// Leaf, may carry content
    File,
}

/// One node of the project tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructureNode {
    /// Entry name (the root uses the project directory name)
    pub name: String,

    /// Serialized as `"type"`
    #[serde(rename = "type")]
    pub kind: NodeKind,

    /// Present on directories only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<StructureNode>>,

    /// Content of a selected file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl StructureNode {
    fn directory(name: String, children: Vec<StructureNode>) -> Self {
        Self {
            name,
            kind: NodeKind::Directory,
            children: Some(children),
            content: None,
        }
    }

    fn file(name: String) -> Self {
        Self {
            name,
            kind: NodeKind::File,
            children: None,
            content: None,
        }
    }

    /// Returns true for directory nodes.
    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    /// Children of a directory; empty for files.
    #[must_use]
    pub fn children(&self) -> &[StructureNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Visits every file node with its root-relative path (the root's own
    /// name is not part of the path).
    pub fn for_each_file<F: FnMut(&str, &StructureNode)>(&self, mut visit: F) {
        fn walk<F: FnMut(&str, &StructureNode)>(node: &StructureNode, prefix: &str, visit: &mut F) {
            for child in node.children() {
                let path = if prefix.is_empty() {
                    child.name.clone()
                } else {
                    format!("{prefix}/{}", child.name)
                };
                if child.is_directory() {
                    walk(child, &path, visit);
                } else {
                    visit(&path, child);
                }
            }
        }
        walk(self, "", &mut visit);
    }
}

/// Builds the tree of `root`.
///
/// # Errors
///
/// Returns an error if the root directory cannot be listed.
pub fn build_structure(root: &Path, ignore: &IgnorePatterns) -> Result<StructureNode> {
    if !root.is_dir() {
        return Err(Error::config(format!(
            "Project path is not a directory: {}",
            root.display()
        )));
    }

    let name = root
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| root.display().to_string());

    let children = list_children(root, root, ignore);
    Ok(StructureNode::directory(name, children))
}

fn list_children(dir: &Path, root: &Path, ignore: &IgnorePatterns) -> Vec<StructureNode> {
    let mut children = Vec::new();

    let entries = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", dir.display(), e);
                continue;
            }
        };

        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.path_is_symlink() && !entry.path().is_file() {
            trace!("Structure skips link {}", entry.path().display());
            continue;
        }
        let is_dir = entry.file_type().is_dir();
        if is_excluded(&name, is_dir) || ignore.is_ignored(&relative_path(entry.path(), root)) {
            trace!("Structure skips {}", entry.path().display());
            continue;
        }

        if is_dir {
            let nested = list_children(entry.path(), root, ignore);
            if !nested.is_empty() {
                children.push(StructureNode::directory(name, nested));
            }
        } else {
            children.push(StructureNode::file(name));
        }
    }

    children
}

fn is_excluded(name: &str, is_dir: bool) -> bool {
    if name.starts_with('.') && !VISIBLE_DOTFILES.contains(&name) {
        return true;
    }

    if is_dir {
        return JUNK_DIRS.contains(&name);
    }

    name.rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && JUNK_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Copies the content of selected files into the matching file nodes.
pub fn attach_content(node: &mut StructureNode, selected: &[Candidate]) {
    let by_path: HashMap<&str, &Candidate> = selected
        .iter()
        .map(|c| (c.relative_path.as_str(), c))
        .collect();

    fn walk(node: &mut StructureNode, prefix: &str, by_path: &HashMap<&str, &Candidate>) {
        let Some(children) = node.children.as_mut() else {
            return;
        };
        for child in children {
            let path = if prefix.is_empty() {
                child.name.clone()
            } else {
                format!("{prefix}/{}", child.name)
            };
            if child.is_directory() {
                walk(child, &path, by_path);
            } else if let Some(candidate) = by_path.get(path.as_str()) {
                child.content = Some(candidate.content_str().to_string());
            }
        }
    }

    walk(node, "", &by_path);
}

/// Renders the tree as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json(node: &StructureNode) -> Result<String> {
    Ok(serde_json::to_string_pretty(node)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;

    fn names(node: &StructureNode) -> Vec<&str> {
        node.children().iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_tree_is_sorted_and_filtered() {
        let temp = TempDir::new().unwrap();
        temp.child("b.py").write_str("b").unwrap();
        temp.child("a.py").write_str("a").unwrap();
        temp.child(".git/HEAD").write_str("ref").unwrap();
        temp.child(".ignore").write_str("*.log").unwrap();
        temp.child(".env").write_str("X=1").unwrap();
        temp.child("node_modules/pkg/index.js").write_str("x").unwrap();
        temp.child("lib/native.so").write_str("x").unwrap();
        temp.child("src/main.py").write_str("x").unwrap();
        temp.child("run.log").write_str("x").unwrap();

        let ignore = IgnorePatterns::parse("*.log").unwrap();
        let tree = build_structure(temp.path(), &ignore).unwrap();

        assert!(tree.is_directory());
        // lib/ only held a junk file, so it is dropped
        assert_eq!(names(&tree), vec![".ignore", "a.py", "b.py", "src"]);
        assert_eq!(names(&tree.children()[3]), vec!["main.py"]);
    }

    #[test]
    fn test_ignored_directory_is_omitted() {
        let temp = TempDir::new().unwrap();
        temp.child("project/build/output.txt").write_str("x").unwrap();
        temp.child("project/out/keep.txt").write_str("x").unwrap();

        let ignore = IgnorePatterns::parse("out/").unwrap();
        let tree = build_structure(temp.path(), &ignore).unwrap();

        // build/ is junk, out/ is ignored, so project/ is empty and dropped
        assert!(tree.children().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_links_to_files_listed_links_to_dirs_skipped() {
        use std::os::unix::fs::symlink;

        let outside = TempDir::new().unwrap();
        outside.child("shared.py").write_str("x").unwrap();
        outside.child("vendor/lib.py").write_str("x").unwrap();

        let temp = TempDir::new().unwrap();
        temp.child("main.py").write_str("x").unwrap();
        symlink(outside.child("shared.py").path(), temp.child("shared.py").path()).unwrap();
        symlink(outside.child("vendor").path(), temp.child("vendor").path()).unwrap();

        let tree = build_structure(temp.path(), &IgnorePatterns::default()).unwrap();
        assert_eq!(names(&tree), vec!["main.py", "shared.py"]);
    }

    #[test]
    fn test_attach_content_and_json_shape() {
        let temp = TempDir::new().unwrap();
        temp.child("src/app.py").write_str("print(1)").unwrap();
        temp.child("notes.txt").write_str("n").unwrap();

        let mut tree = build_structure(temp.path(), &IgnorePatterns::default()).unwrap();
        let mut selected = Candidate::new("src/app.py", temp.path().join("src/app.py"), 8, 0);
        selected.content = Some("print(1)".to_string());
        attach_content(&mut tree, &[selected]);

        let json: serde_json::Value = serde_json::from_str(&to_json(&tree).unwrap()).unwrap();
        assert_eq!(json["type"], "directory");

        let notes = &json["children"][0];
        assert_eq!(notes["name"], "notes.txt");
        assert_eq!(notes["type"], "file");
        assert!(notes.get("content").is_none());
        assert!(notes.get("children").is_none());

        let app = &json["children"][1]["children"][0];
        assert_eq!(app["name"], "app.py");
        assert_eq!(app["content"], "print(1)");
    }

    #[test]
    fn test_for_each_file_yields_relative_paths() {
        let temp = TempDir::new().unwrap();
        temp.child("a/b/c.rs").write_str("x").unwrap();
        temp.child("top.md").write_str("x").unwrap();

        let tree = build_structure(temp.path(), &IgnorePatterns::default()).unwrap();
        let mut paths = Vec::new();
        tree.for_each_file(|path, _| paths.push(path.to_string()));

        assert_eq!(paths, vec!["a/b/c.rs", "top.md"]);
    }

    #[test]
    fn test_missing_root_is_error() {
        let result = build_structure(Path::new("/nonexistent/tree"), &IgnorePatterns::default());
        assert!(result.is_err());
    }
}
