//! Tree of folders and files materialised by an API fetch

use crate::utils::remote_name;
use serde::Serialize;
use std::fmt::Write as _;

/// One remote directory that was visited, with what was found inside it
///
/// Children appear in the order their downloads or walks completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderNode {
    /// Full remote path from the repository root
    pub path: String,
    pub name: String,
    pub folders: Vec<FolderNode>,
    pub files: Vec<String>,
}

impl FolderNode {
    #[must_use]
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_owned(),
            name: remote_name(path).to_owned(),
            folders: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Number of files in the whole subtree
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.len() + self.folders.iter().map(Self::file_count).sum::<usize>()
    }

    /// Number of folders in the whole subtree, this one included
    #[must_use]
    pub fn folder_count(&self) -> usize {
        1 + self.folders.iter().map(Self::folder_count).sum::<usize>()
    }

    /// Find a descendant (or this node) by full remote path
    #[must_use]
    pub fn find(&self, path: &str) -> Option<&Self> {
        if self.path == path {
            return Some(self);
        }
        self.folders.iter().find_map(|folder| folder.find(path))
    }

    /// Sort folders and files by name, recursively
    pub fn sort(&mut self) {
        self.files.sort();
        self.folders.sort_by(|a, b| a.name.cmp(&b.name));
        for folder in &mut self.folders {
            folder.sort();
        }
    }

    /// Indented text rendering, folders before files
    ///
    /// ```text
    /// src/lib/
    ///   sub/
    ///     b.txt
    ///   a.txt
    /// ```
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}/", self.path);
        self.render_children(&mut out, 1);
        out
    }

    fn render_children(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        for folder in &self.folders {
            let _ = writeln!(out, "{indent}{}/", folder.name);
            folder.render_children(out, depth + 1);
        }
        for file in &self.files {
            let _ = writeln!(out, "{indent}{file}");
        }
    }
}
