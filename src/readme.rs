//! Generated README for an export batch.

use crate::file::Candidate;
use crate::structure::StructureNode;
use serde::Serialize;
use std::collections::HashMap;

/// Minimum importance for a file to be listed as a key file.
pub const KEY_FILE_IMPORTANCE: u32 = 15;
const MAX_KEY_FILES: usize = 10;
const FILES_PER_DIRECTORY: usize = 5;
const INDENT: usize = 2;

/// A row of the key-files table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyFile {
    /// Project-relative path
    pub path: String,

    /// Short guess at what the file is for
    pub purpose: &'static str,
}

/// Everything the README template needs.
#[derive(Debug, Clone, Serialize)]
pub struct ReadmeContext {
    /// Project name, used as the title
    pub project_name: String,

    /// First paragraph of the project's own README, or a placeholder
    pub description: String,

    /// Files visible in the project tree
    pub total_files: usize,

    /// Language of the most frequent extension
    pub main_language: String,

    /// Most important selected files, at most ten
    pub key_files: Vec<KeyFile>,

    /// Indented tree preview
    pub structure: String,

    /// Token budget of the batch
    pub max_tokens: usize,
}

impl ReadmeContext {
    /// Analyzes the tree and the selected files.
    #[must_use]
    pub fn new(
        project_name: &str,
        tree: &StructureNode,
        selected: &[Candidate],
        max_tokens: usize,
    ) -> Self {
        let (total_files, main_language) = analyze(tree);

        Self {
            project_name: project_name.to_string(),
            description: extract_description(selected)
                .unwrap_or_else(|| format!("{project_name} - Project prepared for LLM assistance.")),
            total_files,
            main_language,
            key_files: key_files(selected),
            structure: format_structure(tree),
            max_tokens,
        }
    }
}

/// Counts visible files and picks the most frequent extension.
fn analyze(tree: &StructureNode) -> (usize, String) {
    let mut total = 0;
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();

    tree.for_each_file(|_, node| {
        if node.name.starts_with('.') {
            return;
        }
        total += 1;
        if let Some((stem, ext)) = node.name.rsplit_once('.') {
            if !stem.is_empty() {
                let seen = counts.len();
                counts.entry(ext.to_lowercase()).or_insert((0, seen)).0 += 1;
            }
        }
    });

    // Most files wins, first seen breaks ties
    let main = counts
        .into_iter()
        .max_by(|(_, (a, a_seen)), (_, (b, b_seen))| a.cmp(b).then(b_seen.cmp(a_seen)))
        .map_or_else(|| "Unknown".to_string(), |(ext, _)| language_name(&ext));

    (total, main)
}

/// First paragraph of a root README.md (title skipped), falling back to the
/// `description=` argument of a root setup.py.
fn extract_description(selected: &[Candidate]) -> Option<String> {
    let root_file = |name: &str| {
        selected
            .iter()
            .find(|c| c.relative_path.eq_ignore_ascii_case(name))
            .and_then(|c| c.content.as_deref())
    };

    if let Some(readme) = root_file("readme.md") {
        let mut lines = readme.lines().peekable();
        if lines.peek().is_some_and(|l| l.starts_with("# ")) {
            lines.next();
        }
        let paragraph: Vec<&str> = lines.take_while(|l| !l.trim().is_empty()).collect();
        if !paragraph.is_empty() {
            return Some(paragraph.join(" "));
        }
    }

    let setup = root_file("setup.py")?;
    let start = setup.find("description=")? + "description=".len();
    let end = start + setup[start..].find(',')?;
    let value = setup[start..end].trim().trim_matches(|c| c == '"' || c == '\'');
    (!value.is_empty()).then(|| value.to_string())
}

fn key_files(selected: &[Candidate]) -> Vec<KeyFile> {
    let mut important: Vec<&Candidate> = selected
        .iter()
        .filter(|c| c.importance >= KEY_FILE_IMPORTANCE)
        .collect();
    important.sort_by(|a, b| b.importance.cmp(&a.importance));

    important
        .into_iter()
        .take(MAX_KEY_FILES)
        .map(|c| KeyFile {
            path: c.relative_path.clone(),
            purpose: suggest_purpose(&c.relative_path),
        })
        .collect()
}

/// Guesses what a file is for from its name and location.
#[must_use]
pub fn suggest_purpose(path: &str) -> &'static str {
    let (dir, name) = path.rsplit_once('/').unwrap_or(("", path));
    let dir = dir.to_lowercase();
    let ext = name.rsplit_once('.').map_or("", |(_, e)| e);
    let is_source = matches!(ext, "py" | "rs" | "js" | "ts" | "go" | "java" | "rb");

    match name {
        "__init__.py" => return "Python module initialization",
        "mod.rs" => return "Rust module declaration",
        "main.py" | "main.rs" | "main.go" | "index.js" | "app.py" => {
            return "Application entry point";
        }
        "lib.rs" => return "Library crate root",
        "setup.py" | "pyproject.toml" => return "Package installation configuration",
        "Cargo.toml" | "package.json" => return "Package manifest",
        "requirements.txt" => return "Python dependencies list",
        "config.ini" | "config.toml" => return "Application configuration",
        "Dockerfile" => return "Container build definition",
        "Makefile" => return "Build automation",
        _ => {}
    }

    if name.starts_with("README") {
        return "Project documentation";
    }
    if is_source && name.to_lowercase().contains("test") {
        return "Unit/integration test";
    }
    if matches!(ext, "bat" | "sh" | "ps1") {
        return "Execution script";
    }
    if is_source {
        for (fragment, purpose) in [
            ("utils", "Utility functions"),
            ("core", "Core application logic"),
            ("api", "API implementation"),
            ("gui", "User interface component"),
        ] {
            if dir.contains(fragment) {
                return purpose;
            }
        }
    }

    match ext {
        "py" => "Python module",
        "rs" => "Rust module",
        "js" | "ts" | "jsx" | "tsx" => "JavaScript module",
        "html" | "css" => "Web interface component",
        "json" | "yaml" | "yml" | "toml" => "Data configuration",
        "md" => "Documentation",
        _ => "Project file",
    }
}

/// Indented outline: directories first, at most five files per directory.
#[must_use]
pub fn format_structure(tree: &StructureNode) -> String {
    let mut out = String::new();
    format_node(tree, 0, &mut out);
    out
}

fn format_node(node: &StructureNode, indent: usize, out: &mut String) {
    let pad = " ".repeat(indent);
    if !node.is_directory() {
        out.push_str(&format!("{pad}{}\n", node.name));
        return;
    }

    out.push_str(&format!("{pad}{}/\n", node.name));

    let (dirs, files): (Vec<&StructureNode>, Vec<&StructureNode>) =
        node.children().iter().partition(|c| c.is_directory());

    for dir in dirs {
        format_node(dir, indent + INDENT, out);
    }
    for file in files.iter().take(FILES_PER_DIRECTORY) {
        format_node(file, indent + INDENT, out);
    }
    if files.len() > FILES_PER_DIRECTORY {
        out.push_str(&format!("{}...\n", " ".repeat(indent + INDENT)));
    }
}

fn language_name(ext: &str) -> String {
    let name = match ext {
        "rs" => "Rust",
        "py" => "Python",
        "js" | "jsx" => "JavaScript",
        "ts" | "tsx" => "TypeScript",
        "go" => "Go",
        "java" => "Java",
        "kt" => "Kotlin",
        "rb" => "Ruby",
        "php" => "PHP",
        "c" | "h" => "C",
        "cpp" | "cc" | "hpp" => "C++",
        "cs" => "C#",
        "swift" => "Swift",
        "md" => "Markdown",
        "html" => "HTML",
        "css" => "CSS",
        other => return other.to_string(),
    };
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::IgnorePatterns;
    use crate::structure::build_structure;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;

    fn with_content(path: &str, importance: u32, content: &str) -> Candidate {
        let mut c = Candidate::new(path, path, content.len() as u64, importance);
        c.content = Some(content.to_string());
        c
    }

    #[test]
    fn test_description_from_readme_paragraph() {
        let selected = [with_content(
            "README.md",
            30,
            "# Tool\nFirst line\nsecond line\n\nMore text",
        )];
        assert_eq!(
            extract_description(&selected).as_deref(),
            Some("First line second line")
        );
    }

    #[test]
    fn test_description_from_setup_py() {
        let selected = [with_content(
            "setup.py",
            30,
            "setup(name='x', description='A helpful tool', version='1')",
        )];
        assert_eq!(extract_description(&selected).as_deref(), Some("A helpful tool"));
    }

    #[test]
    fn test_nested_readme_is_not_description() {
        let selected = [with_content("docs/README.md", 30, "Nested")];
        assert!(extract_description(&selected).is_none());
    }

    #[test]
    fn test_key_files_threshold_and_order() {
        let mut selected: Vec<Candidate> = (0..12)
            .map(|i| with_content(&format!("src/m{i:02}.py"), 15, ""))
            .collect();
        selected.push(with_content("low.txt", 5, ""));
        selected.push(with_content("README.md", 35, ""));

        let keys = key_files(&selected);
        assert_eq!(keys.len(), MAX_KEY_FILES);
        assert_eq!(keys[0].path, "README.md");
        assert_eq!(keys[0].purpose, "Project documentation");
        assert!(keys.iter().all(|k| k.path != "low.txt"));
    }

    #[test]
    fn test_suggest_purpose() {
        assert_eq!(suggest_purpose("src/main.py"), "Application entry point");
        assert_eq!(suggest_purpose("tests/test_api.py"), "Unit/integration test");
        assert_eq!(suggest_purpose("src/core/engine.py"), "Core application logic");
        assert_eq!(suggest_purpose("scripts/run.sh"), "Execution script");
        assert_eq!(suggest_purpose("data/config.yaml"), "Data configuration");
        assert_eq!(suggest_purpose("LICENSE"), "Project file");
    }

    #[test]
    fn test_format_structure_limits_files() {
        let temp = TempDir::new().unwrap();
        for i in 0..7 {
            temp.child(format!("f{i}.py")).write_str("x").unwrap();
        }
        temp.child("zdir/a.py").write_str("x").unwrap();

        let tree = build_structure(temp.path(), &IgnorePatterns::default()).unwrap();
        let text = format_structure(&tree);
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].ends_with('/'));
        assert_eq!(lines[1], "  zdir/");
        assert_eq!(lines[2], "    a.py");
        assert_eq!(lines[3], "  f0.py");
        assert_eq!(lines[8], "  ...");
        assert_eq!(lines.len(), 9);
    }

    #[test]
    fn test_context_main_language() {
        let temp = TempDir::new().unwrap();
        temp.child("a.py").write_str("x").unwrap();
        temp.child("b.py").write_str("x").unwrap();
        temp.child("c.md").write_str("x").unwrap();
        temp.child(".ignore").write_str("x").unwrap();

        let tree = build_structure(temp.path(), &IgnorePatterns::default()).unwrap();
        let context = ReadmeContext::new("demo", &tree, &[], 1000);

        assert_eq!(context.total_files, 3);
        assert_eq!(context.main_language, "Python");
        assert_eq!(context.description, "demo - Project prepared for LLM assistance.");
    }
}
