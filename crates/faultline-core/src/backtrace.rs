//! Backtrace line filters
//!
//! Every frame of a notice's backtrace is passed through an ordered chain of
//! line filters before delivery. A filter returns the rewritten line, or
//! `None` to drop the frame entirely. The default chain hides local paths
//! (project root, cargo registry) and removes the reporter's own frames.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

/// Placeholder for the host project's root directory.
pub const PROJECT_ROOT_PLACEHOLDER: &str = "[PROJECT_ROOT]";

/// Placeholder for cargo's dependency source directories.
pub const CARGO_ROOT_PLACEHOLDER: &str = "[CARGO_ROOT]";

/// Matches frames in the reporter's own code: symbol paths, and source
/// paths in a workspace checkout (`faultline-core/src/`) or a registry
/// download (`faultline-core-0.1.0/src/`), absolute or relative.
static SELF_FRAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"faultline_(core|notifier)::|(^|[\s/\\])faultline-(core|notifier)(-[0-9][^/\\]*)?[/\\]src[/\\]")
        .expect("self-frame pattern is valid")
});

/// A single line transform: `line -> optional line`.
pub type BacktraceFilter = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Ordered chain of backtrace filters.
#[derive(Clone, Default)]
pub struct BacktraceFilters {
    filters: Vec<BacktraceFilter>,
}

impl BacktraceFilters {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a chain holding only the default filters.
    pub fn with_defaults(project_root: Option<&Path>) -> Self {
        let mut chain = Self::new();
        chain.install_defaults(project_root, &dependency_roots());
        chain
    }

    /// Appends a filter to the end of the chain.
    pub fn push<F>(&mut self, filter: F)
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.filters.push(Arc::new(filter));
    }

    /// Appends an already shared filter.
    pub fn push_shared(&mut self, filter: BacktraceFilter) {
        self.filters.push(filter);
    }

    /// Removes every filter, defaults included.
    pub fn clear(&mut self) {
        self.filters.clear();
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Clears the chain and installs the default filters, in order:
    /// project-root rewriting, `./` stripping, dependency-root rewriting,
    /// and exclusion of the reporter's own frames.
    pub fn install_defaults(&mut self, project_root: Option<&Path>, dep_roots: &[PathBuf]) {
        self.clear();

        let root = project_root
            .map(|p| p.to_string_lossy().to_string())
            .filter(|r| is_rewritable_root(r));
        self.push(move |line| {
            Some(match &root {
                Some(root) => line.replace(root.as_str(), PROJECT_ROOT_PLACEHOLDER),
                None => line.to_string(),
            })
        });

        self.push(|line| Some(line.strip_prefix("./").unwrap_or(line).to_string()));

        let dep_roots: Vec<String> = dep_roots
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .filter(|r| is_rewritable_root(r))
            .collect();
        self.push(move |line| {
            Some(
                dep_roots
                    .iter()
                    .fold(line.to_string(), |acc, root| {
                        acc.replace(root.as_str(), CARGO_ROOT_PLACEHOLDER)
                    }),
            )
        });

        self.push(|line| {
            if SELF_FRAME.is_match(line) {
                None
            } else {
                Some(line.to_string())
            }
        });
    }

    /// Runs `line` through the chain left to right.
    ///
    /// Returns `None` as soon as any filter drops the line.
    pub fn apply(&self, line: &str) -> Option<String> {
        let mut current = line.to_string();
        for filter in &self.filters {
            current = filter(&current)?;
        }
        Some(current)
    }
}

impl fmt::Debug for BacktraceFilters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BacktraceFilters")
            .field("len", &self.filters.len())
            .finish()
    }
}

/// A root shorter than two characters ("" or "/") would rewrite every path.
fn is_rewritable_root(root: &str) -> bool {
    root.trim_end_matches('/').len() > 1
}

/// Cargo directories holding dependency sources on this machine.
pub fn dependency_roots() -> Vec<PathBuf> {
    let cargo_home = std::env::var_os("CARGO_HOME")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|h| h.join(".cargo")));

    match cargo_home {
        Some(home) => vec![
            home.join("registry").join("src"),
            home.join("git").join("checkouts"),
        ],
        None => Vec::new(),
    }
}

/// Splits a backtrace supplied as text into discrete frames.
///
/// Each physical line becomes one frame with surrounding whitespace trimmed;
/// blank lines are discarded.
pub fn split_frames(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Captures the current call stack as frame strings.
pub fn capture_frames() -> Vec<String> {
    split_frames(&std::backtrace::Backtrace::force_capture().to_string())
}
