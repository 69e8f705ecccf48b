//! File picker state.

use std::path::{Path, PathBuf};

/// A directory listing entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub is_dir: bool,
}

/// State of an open file picker.
#[derive(Clone, Debug, PartialEq)]
pub struct FileDialogState {
    dirname: PathBuf,
    filename: String,
    entries: Vec<FileEntry>,
    save: bool,
    remove_hidden: bool,
    filter: String,
    extensions: Vec<String>,
}

impl FileDialogState {
    /// Creates a picker rooted at `dirname`.
    ///
    /// `filter` is a `;`-separated list of glob patterns such as
    /// `*.obj;*.ply`. In open mode (`save == false`) only existing files are
    /// accepted as the selected filename.
    pub fn new(dirname: impl AsRef<Path>, filename: &str, save: bool, filter: &str) -> Self {
        let mut state = Self {
            dirname: PathBuf::new(),
            filename: String::new(),
            entries: Vec::new(),
            save,
            remove_hidden: true,
            filter: String::new(),
            extensions: Vec::new(),
        };
        state.set_filter(filter);
        state.set_dirname(dirname);
        state.set_filename(filename);
        state
    }

    pub fn dirname(&self) -> &Path {
        &self.dirname
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn set_dirname(&mut self, dirname: impl AsRef<Path>) {
        let dirname = dirname.as_ref();
        self.dirname = if dirname.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            dirname.to_path_buf()
        };
        self.refresh();
    }

    /// Moves to the parent directory, if there is one.
    pub fn go_up(&mut self) {
        let parent = std::fs::canonicalize(&self.dirname)
            .ok()
            .and_then(|dir| dir.parent().map(Path::to_path_buf));
        if let Some(parent) = parent {
            self.set_dirname(parent);
        }
    }

    /// Sets the selected filename, clearing it if it is not acceptable.
    pub fn set_filename(&mut self, filename: &str) {
        self.filename = filename.to_string();
        self.check_filename();
    }

    /// Parses a `;`-separated glob list into the extension filter.
    ///
    /// Patterns without an extension are dropped. The stored filter is
    /// normalized to `*.ext;*.ext`.
    pub fn set_filter(&mut self, filter: &str) {
        self.extensions = filter
            .split(';')
            .filter_map(|pattern| {
                Path::new(pattern.trim())
                    .extension()
                    .map(|ext| ext.to_string_lossy().into_owned())
            })
            .filter(|ext| !ext.is_empty())
            .collect();
        self.filter = self
            .extensions
            .iter()
            .map(|ext| format!("*.{}", ext))
            .collect::<Vec<_>>()
            .join(";");
        self.check_filename();
    }

    fn accepts_extension(&self, name: &str) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        Path::new(name)
            .extension()
            .map(|ext| self.extensions.iter().any(|e| *e == *ext.to_string_lossy()))
            .unwrap_or(false)
    }

    fn check_filename(&mut self) {
        if self.filename.is_empty() {
            return;
        }
        if !self.accepts_extension(&self.filename) {
            self.filename.clear();
            return;
        }
        if !self.save && !self.dirname.join(&self.filename).is_file() {
            self.filename.clear();
        }
    }

    /// Selects the entry at `index`: directories are entered, files become
    /// the selected filename.
    pub fn select_entry(&mut self, index: usize) {
        let Some(entry) = self.entries.get(index).cloned() else {
            return;
        };
        if entry.is_dir {
            let dirname = self.dirname.join(&entry.name);
            self.set_dirname(dirname);
        } else {
            self.set_filename(&entry.name);
        }
    }

    /// Re-reads the directory. Unreadable directories list as empty.
    pub fn refresh(&mut self) {
        self.entries.clear();
        let read_dir = match std::fs::read_dir(&self.dirname) {
            Ok(read_dir) => read_dir,
            Err(err) => {
                log::warn!("cannot list {}: {}", self.dirname.display(), err);
                return;
            }
        };
        for entry in read_dir.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.remove_hidden && name.starts_with('.') {
                continue;
            }
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir && !self.accepts_extension(&name) {
                continue;
            }
            self.entries.push(FileEntry { name, is_dir });
        }
        self.entries
            .sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
    }

    /// Full path of the selection, if a filename is selected.
    pub fn path(&self) -> Option<PathBuf> {
        if self.filename.is_empty() {
            None
        } else {
            Some(self.dirname.join(&self.filename))
        }
    }
}
