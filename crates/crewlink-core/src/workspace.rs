//! Workspace and result file lists with their single selection

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Files the backend wrote into the session's working directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkspaceListing {
    files: Vec<String>,
    selected: Option<usize>,
}

impl WorkspaceListing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the listing.
    ///
    /// A selection survives only if its path is still listed; an empty
    /// selection on a non-empty listing falls to the first entry.
    pub fn replace(&mut self, files: Vec<String>) {
        let previous = self.selected_path().map(str::to_string);
        self.files = files;
        self.selected = previous.and_then(|path| self.position(&path));
        if self.selected.is_none() && !self.files.is_empty() {
            self.selected = Some(0);
        }
    }

    pub fn select(&mut self, index: usize) -> Result<()> {
        if index >= self.files.len() {
            return Err(Error::NoSelection(format!(
                "workspace file {} (listing has {})",
                index,
                self.files.len()
            )));
        }
        self.selected = Some(index);
        Ok(())
    }

    /// Drop the selection when there is nothing to select
    pub fn clear_selection_if_empty(&mut self) {
        if self.files.is_empty() {
            self.selected = None;
        }
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_path(&self) -> Option<&str> {
        self.selected
            .and_then(|i| self.files.get(i))
            .map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.iter().any(|f| f == path)
    }

    fn position(&self, path: &str) -> Option<usize> {
        self.files.iter().position(|f| f == path)
    }
}

/// A result delivered inline with its content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultFile {
    pub name: String,
    pub content: String,
}

impl ResultFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultFiles {
    files: Vec<ResultFile>,
    selected: Option<usize>,
}

impl ResultFiles {
    pub fn replace(&mut self, files: Vec<ResultFile>) {
        self.files = files;
        self.selected = None;
    }

    pub fn clear(&mut self) {
        self.replace(Vec::new());
    }

    pub fn select(&mut self, index: usize) -> Result<()> {
        if index >= self.files.len() {
            return Err(Error::NoSelection(format!(
                "result file {} (have {})",
                index,
                self.files.len()
            )));
        }
        self.selected = Some(index);
        Ok(())
    }

    pub fn files(&self) -> &[ResultFile] {
        &self.files
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_file(&self) -> Option<&ResultFile> {
        self.selected.and_then(|i| self.files.get(i))
    }
}

/// Local file name for a backend path: its last segment, never a directory
/// component.
pub fn download_name(remote_path: &str) -> Option<String> {
    let last = remote_path.rsplit(['/', '\\']).next()?;
    Path::new(last)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// Where a download of `remote_path` lands inside `dest_dir`
pub fn download_target(dest_dir: &Path, remote_path: &str) -> Result<PathBuf> {
    download_name(remote_path)
        .map(|name| dest_dir.join(name))
        .ok_or_else(|| Error::DownloadFileMissing(remote_path.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_first_listing_selects_first_entry() {
        let mut listing = WorkspaceListing::new();
        listing.replace(names(&["a.txt", "b.txt"]));
        assert_eq!(listing.selected(), Some(0));
        assert_eq!(listing.selected_path(), Some("a.txt"));
    }

    #[test]
    fn test_empty_listing_has_no_selection() {
        let mut listing = WorkspaceListing::new();
        listing.replace(Vec::new());
        assert_eq!(listing.selected(), None);
    }

    #[test]
    fn test_selection_follows_path_across_refresh() {
        let mut listing = WorkspaceListing::new();
        listing.replace(names(&["a.txt", "b.txt"]));
        listing.select(1).unwrap();

        listing.replace(names(&["new.md", "a.txt", "b.txt"]));
        assert_eq!(listing.selected_path(), Some("b.txt"));
        assert_eq!(listing.selected(), Some(2));
    }

    #[test]
    fn test_vanished_selection_falls_back_to_first() {
        let mut listing = WorkspaceListing::new();
        listing.replace(names(&["a.txt", "b.txt"]));
        listing.select(1).unwrap();

        listing.replace(names(&["c.txt"]));
        assert_eq!(listing.selected_path(), Some("c.txt"));

        listing.replace(Vec::new());
        assert_eq!(listing.selected(), None);
    }

    #[test]
    fn test_select_out_of_range() {
        let mut listing = WorkspaceListing::new();
        listing.replace(names(&["a.txt"]));
        assert!(matches!(listing.select(3), Err(Error::NoSelection(_))));
        assert_eq!(listing.selected(), Some(0));
    }

    #[test]
    fn test_result_selection_invalidated_on_replace() {
        let mut results = ResultFiles::default();
        results.replace(vec![ResultFile::new("report.md", "# Report")]);
        results.select(0).unwrap();
        assert_eq!(results.selected_file().unwrap().name, "report.md");

        results.clear();
        assert_eq!(results.selected(), None);
        assert!(results.select(0).is_err());
    }

    #[test]
    fn test_download_name() {
        assert_eq!(download_name("docs/outline.txt").as_deref(), Some("outline.txt"));
        assert_eq!(download_name("notes\\draft.md").as_deref(), Some("draft.md"));
        assert_eq!(download_name("plain.txt").as_deref(), Some("plain.txt"));
        assert_eq!(download_name("dir/"), None);
        assert_eq!(download_name("../.."), None);
    }
}
