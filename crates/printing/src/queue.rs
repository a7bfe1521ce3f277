use std::path::PathBuf;

/// File waiting in the print queue.
/// 列印佇列中的檔案。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedFile {
    pub path: PathBuf,
    pub active: bool,
}

impl QueuedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            active: true,
        }
    }

    /// File name shown in queue lists.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Ordered list of queued files; lives only for the session.
#[derive(Debug, Clone, Default)]
pub struct PrintQueue {
    files: Vec<QueuedFile>,
}

impl PrintQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an active entry. Returns `true` when it is the first entry.
    pub fn add(&mut self, path: impl Into<PathBuf>) -> bool {
        let first = self.files.is_empty();
        self.files.push(QueuedFile::new(path));
        first
    }

    pub fn remove(&mut self, index: usize) -> Option<QueuedFile> {
        (index < self.files.len()).then(|| self.files.remove(index))
    }

    pub fn set_active(&mut self, index: usize, active: bool) -> bool {
        match self.files.get_mut(index) {
            Some(file) => {
                file.active = active;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, index: usize) -> Option<&QueuedFile> {
        self.files.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueuedFile> {
        self.files.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut QueuedFile> {
        self.files.iter_mut()
    }

    /// Snapshot of the active paths in queue order.
    pub fn active_paths(&self) -> Vec<PathBuf> {
        self.files
            .iter()
            .filter(|file| file.active)
            .map(|file| file.path.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
