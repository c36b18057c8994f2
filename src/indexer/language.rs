//! Supported source languages and project language detection.
//!
//! Each language is known by its file extensions and project marker files
//! (`go.mod`, `package.json`, `pom.xml`, ...). Detection walks the project
//! tree, skipping [`SKIP_DIRS`], and stops once every language has matched.

use std::path::Path;

use serde::{Deserialize, Serialize};
use walkdir::{DirEntry, WalkDir};

/// Directories never scanned for sources: VCS, dependencies, caches and our own state.
pub const SKIP_DIRS: &[&str] = &[
    // VCS
    ".git",
    ".hg",
    ".svn",
    // Dependencies
    "node_modules",
    "vendor",
    // Build artifacts / caches
    "target",
    "__pycache__",
    ".venv",
    "venv",
    // IDE
    ".idea",
    ".vscode",
    // Our own index
    ".codeintel",
];

/// Languages with a registered SCIP indexer.
///
/// Declaration order is detection priority.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Go,
    /// TypeScript and JavaScript share one indexer.
    #[value(name = "typescript", alias = "ts")]
    TypeScript,
    Python,
    Java,
}

impl Language {
    /// All languages in detection priority order.
    pub const ALL: [Language; 4] = [
        Language::Go,
        Language::TypeScript,
        Language::Python,
        Language::Java,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Go => "go",
            Language::TypeScript => "typescript",
            Language::Python => "python",
            Language::Java => "java",
        }
    }

    /// File extensions this language typically uses.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Go => &["go"],
            Language::TypeScript => &["ts", "tsx", "js", "jsx", "mjs", "cjs"],
            Language::Python => &["py"],
            Language::Java => &["java"],
        }
    }

    /// Project marker files that identify this language.
    pub fn markers(&self) -> &'static [&'static str] {
        match self {
            Language::Go => &["go.mod"],
            Language::TypeScript => &["package.json", "tsconfig.json"],
            Language::Python => &["setup.py", "requirements.txt", "pyproject.toml"],
            Language::Java => &["pom.xml", "build.gradle", "build.gradle.kts"],
        }
    }

    /// Detect language from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|lang| lang.extensions().contains(&ext.as_str()))
    }

    /// Detect language from a file name, by marker or extension.
    pub fn from_file_name(name: &str) -> Option<Self> {
        if let Some(lang) = Self::ALL.into_iter().find(|l| l.markers().contains(&name)) {
            return Some(lang);
        }
        let (_, ext) = name.rsplit_once('.')?;
        Self::from_extension(ext)
    }

    /// Whether a path has one of this language's extensions.
    pub fn matches_path(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions().contains(&ext.to_lowercase().as_str()))
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "go" => Ok(Language::Go),
            "typescript" | "ts" | "javascript" | "js" => Ok(Language::TypeScript),
            "python" | "py" => Ok(Language::Python),
            "java" => Ok(Language::Java),
            _ => Err(format!("unknown language: {}", s)),
        }
    }
}

/// Whether a walk entry is a directory we never descend into.
pub(crate) fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIP_DIRS.contains(&name))
}

/// Detect which registered languages a project uses.
///
/// A language matches when any marker file or any file with one of its
/// extensions exists under `root`. Results follow [`Language::ALL`] order.
/// Unreadable entries are skipped; an empty result is not an error.
pub fn detect_languages(root: &Path) -> Vec<Language> {
    let mut found = [false; Language::ALL.len()];

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e));

    for entry in walker.flatten() {
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if let Some(lang) = Language::from_file_name(name) {
            found[lang as usize] = true;
            if found.iter().all(|f| *f) {
                break;
            }
        }
    }

    Language::ALL
        .into_iter()
        .filter(|lang| found[*lang as usize])
        .collect()
}
