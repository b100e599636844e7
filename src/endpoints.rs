//! Best-effort HTTP endpoint scraping.
//!
//! Each source language has a handful of route-declaration regexes. OpenAPI
//! documents are parsed structurally and fall back to the generic URL
//! grammar when they do not parse. Results are cleaned, de-duplicated in
//! first-seen order and grouped by their first path segment.

use crate::file::Candidate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|p| Regex::new(p).unwrap()).collect()
}

static FLASK: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r#"@(?:app|blueprint|api)\.route\(['"]([^'"]+)['"]"#,
        r#"@(?:app|blueprint|api)\.(?:get|post|put|delete|patch|options|head)\(['"]([^'"]+)['"]"#,
        r#"api\.add_resource\([^,]+,\s*['"]([^'"]+)['"]"#,
        r#"@\w+\.route\(['"]([^'"]+)['"]"#,
    ])
});

static PYTHON: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        // FastAPI
        r#"@(?:app|router)\.(?:get|post|put|delete|patch|head|options)\(['"]([^'"]+)['"]"#,
        // Django
        r#"path\(['"]([^'"]+)['"]"#,
        r#"url\(['"]\^?([^'"^$]+)['"]"#,
    ])
});

static JAVASCRIPT: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r#"(?:app|router)\.(?:get|post|put|delete|patch)\(['"]([^'"]+)['"]"#,
        r#"route\(['"]([^'"]+)['"]"#,
        r#"<Route(?:\s+[^>]*)?path=['"]([^'"]+)['"]"#,
        r#"(?:axios|fetch)\(['"](?:https?://[^/]+)?(/[^'"]+)['"]"#,
        r#"url:\s*['"](?:https?://[^/]+)?(/[^'"]+)['"]"#,
    ])
});

static JVM: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r#"@(?:Request|Get|Post|Put|Delete|Patch)Mapping\(['"]([^'"]+)['"]"#,
        r#"@Path\(['"]([^'"]+)['"]"#,
    ])
});

static RUBY: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r#"(?:get|post|put|patch|delete)\s+['"]([^'"]+)['"]"#,
        r#"match\s+['"]([^'"]+)['"]"#,
    ])
});

static PHP: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r#"Route::(?:get|post|put|patch|delete)\(['"]([^'"]+)['"]"#,
        r#"->add\(['"]([^'"]+)['"]"#,
    ])
});

static GO: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r#"(?:r|router|e|mux)\.(?:GET|POST|PUT|DELETE|PATCH|Handle(?:Func)?)\(['"]([^'"]+)['"]"#,
        r#"http\.Handle(?:Func)?\(['"]([^'"]+)['"]"#,
    ])
});

static GENERIC: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r#"(?:https?://[^/\s]+)?(/api/[^\s'"]+)"#,
        r#"(?:https?://[^/\s]+)?(/v\d+/[^\s'"]+)"#,
        r#"(?:https?://[^/\s]+)?(/rest/[^\s'"]+)"#,
    ])
});

/// Extensions worth scraping.
const SCANNED_EXTENSIONS: &[&str] = &[
    "py", "flask", "js", "ts", "jsx", "tsx", "java", "kt", "scala", "rb", "php", "go", "yaml",
    "yml", "json",
];

/// Endpoints grouped by first path segment.
pub type EndpointGroups = BTreeMap<String, Vec<String>>;

/// Extracts cleaned endpoints from one file.
#[must_use]
pub fn extract_from_file(path: &str, content: &str) -> Vec<String> {
    let ext = path
        .rsplit_once('.')
        .map(|(_, e)| e.to_lowercase())
        .unwrap_or_default();

    let raw = match ext.as_str() {
        "py" | "flask" => {
            let flask = capture_all(&FLASK, content);
            if flask.is_empty() {
                capture_all(&PYTHON, content)
            } else {
                flask
            }
        }
        "js" | "ts" | "jsx" | "tsx" => capture_all(&JAVASCRIPT, content),
        "java" | "kt" | "scala" => capture_all(&JVM, content),
        "rb" => capture_all(&RUBY, content),
        "php" => capture_all(&PHP, content),
        "go" => capture_all(&GO, content),
        "json" | "yaml" | "yml" => from_api_spec(&ext, content),
        _ => capture_all(&GENERIC, content),
    };

    raw.iter()
        .map(|e| clean_endpoint(e))
        .filter(|e| !e.is_empty())
        .collect()
}

/// Scrapes every selected file with a relevant extension and returns the
/// unique endpoints in first-seen order.
#[must_use]
pub fn extract_endpoints(files: &[Candidate]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut endpoints = Vec::new();

    for file in files {
        let ext = file
            .relative_path
            .rsplit_once('.')
            .map(|(_, e)| e.to_lowercase())
            .unwrap_or_default();
        if !SCANNED_EXTENSIONS.contains(&ext.as_str()) {
            continue;
        }

        let found = extract_from_file(&file.relative_path, file.content_str());
        if !found.is_empty() {
            debug!("Found {} endpoints in {}", found.len(), file.relative_path);
        }
        for endpoint in found {
            if seen.insert(endpoint.clone()) {
                endpoints.push(endpoint);
            }
        }
    }

    endpoints
}

/// Strips the query string and trailing slashes and ensures a leading slash.
#[must_use]
pub fn clean_endpoint(endpoint: &str) -> String {
    let path = endpoint.split('?').next().unwrap_or_default();
    let path = path.trim_end_matches('/');
    if path.is_empty() || path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Groups endpoints by their first path segment, keeping input order inside
/// each group.
#[must_use]
pub fn group_by_prefix(endpoints: &[String]) -> EndpointGroups {
    let mut groups = EndpointGroups::new();
    for endpoint in endpoints {
        let prefix = endpoint
            .trim_matches('/')
            .split('/')
            .next()
            .unwrap_or_default()
            .to_string();
        groups.entry(prefix).or_default().push(endpoint.clone());
    }
    groups
}

fn capture_all(patterns: &[Regex], content: &str) -> Vec<String> {
    patterns
        .iter()
        .flat_map(|re| re.captures_iter(content))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Keys of the top-level `paths` object of an OpenAPI or Swagger document.
fn from_api_spec(ext: &str, content: &str) -> Vec<String> {
    let parsed: Option<Value> = if ext == "json" {
        serde_json::from_str(content).ok()
    } else {
        match serde_yaml::from_str::<Value>(content) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Not a YAML document, falling back to URL scan: {e}");
                None
            }
        }
    };

    let Some(document) = parsed else {
        return capture_all(&GENERIC, content);
    };

    document
        .get("paths")
        .and_then(Value::as_object)
        .map(|paths| paths.keys().cloned().collect())
        .unwrap_or_default()
}
