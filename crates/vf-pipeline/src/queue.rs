//! The file queue: one [`QueuedFile`] per accepted input path.

use std::path::{Path, PathBuf};

use serde::Serialize;
use vf_core::{ids, Error, Result};

/// Container extensions the pipeline accepts.
pub const ALLOWED_EXTENSIONS: &[&str] = &["mp4", "mkv", "webm", "mov"];

/// Separates the filename prefix from the generated id in unique folder names.
const PREFIX_SEPARATOR: char = '_';

/// Lifecycle of a queued file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileState {
    Queued,
    Running,
    Done,
    Failed,
}

/// One input awaiting (or undergoing) processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueuedFile {
    /// Original source path; the queue key.
    pub source: PathBuf,
    /// Basename of the source.
    pub filename: String,
    /// Lowercased extension.
    pub extname: String,
    /// Folder name created under the output root.
    pub destination_dir: String,
    pub state: FileState,
}

impl QueuedFile {
    /// Describe `source`.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedInput`] when the extension is not in
    /// [`ALLOWED_EXTENSIONS`].
    pub fn new(source: &Path, use_unique_name: bool) -> Result<Self> {
        let filename = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extname = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        if !ALLOWED_EXTENSIONS.contains(&extname.as_str()) {
            return Err(Error::unsupported(source));
        }

        let stem = filename.split('.').next().unwrap_or_default();
        let destination_dir = if use_unique_name {
            let prefix = stem.split(PREFIX_SEPARATOR).next().unwrap_or(stem);
            format!("{prefix}{PREFIX_SEPARATOR}{}", ids::unique_id())
        } else {
            stem.to_string()
        };

        Ok(Self {
            source: source.to_path_buf(),
            filename,
            extname,
            destination_dir,
            state: FileState::Queued,
        })
    }

    /// Absolute destination folder under `output_root`.
    pub fn destination(&self, output_root: &Path) -> PathBuf {
        output_root.join(&self.destination_dir)
    }
}

/// Ordered map from source path to [`QueuedFile`].
///
/// Order follows the input list. A path given twice keeps its first
/// position but the later entry replaces the earlier one.
#[derive(Debug, Clone, Default)]
pub struct FileQueue {
    files: Vec<QueuedFile>,
}

impl FileQueue {
    /// Build a queue, skipping (and logging) unsupported inputs.
    pub fn create<I, P>(paths: I, use_unique_name: bool) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut queue = Self::default();
        for path in paths {
            let path = path.as_ref();
            match QueuedFile::new(path, use_unique_name) {
                Ok(file) => queue.insert(file),
                Err(e) => tracing::error!("{e}; unsupported file type, file will be skipped"),
            }
        }
        queue
    }

    /// Insert or replace the entry for `file.source`.
    pub fn insert(&mut self, file: QueuedFile) {
        match self.files.iter_mut().find(|f| f.source == file.source) {
            Some(slot) => *slot = file,
            None => self.files.push(file),
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, source: &Path) -> Option<&QueuedFile> {
        self.files.iter().find(|f| f.source == source)
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueuedFile> {
        self.files.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut QueuedFile> {
        self.files.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn plain_destination_is_the_stem() {
        let f = QueuedFile::new(Path::new("/in/My_Movie.final.MP4"), false).unwrap();
        assert_eq!(f.filename, "My_Movie.final.MP4");
        assert_eq!(f.extname, "mp4");
        assert_eq!(f.destination_dir, "My_Movie");
        assert_eq!(f.state, FileState::Queued);
        assert_eq!(f.destination(Path::new("/out")), PathBuf::from("/out/My_Movie"));
    }

    #[test]
    fn unique_destination_uses_prefix_and_id() {
        let f = QueuedFile::new(Path::new("/in/My_Movie.mkv"), true).unwrap();
        let (prefix, id) = f.destination_dir.split_once('_').unwrap();
        assert_eq!(prefix, "My");
        assert_eq!(id.len(), 32);

        let g = QueuedFile::new(Path::new("/in/My_Movie.mkv"), true).unwrap();
        assert_ne!(f.destination_dir, g.destination_dir);
    }

    #[test]
    fn rejects_unknown_extensions() {
        assert_matches!(
            QueuedFile::new(Path::new("/in/clip.avi"), false),
            Err(Error::UnsupportedInput { .. })
        );
        assert_matches!(
            QueuedFile::new(Path::new("/in/noext"), false),
            Err(Error::UnsupportedInput { .. })
        );
    }

    #[test]
    fn queue_skips_unsupported_and_keeps_order() {
        let q = FileQueue::create(["/in/b.mov", "/in/x.avi", "/in/a.webm"], false);
        let names: Vec<&str> = q.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, ["b.mov", "a.webm"]);
        assert!(q.get(Path::new("/in/x.avi")).is_none());
    }

    #[test]
    fn duplicate_paths_replace_in_place() {
        let q = FileQueue::create(["/in/a.mp4", "/in/b.mp4", "/in/a.mp4"], true);
        assert_eq!(q.len(), 2);
        let names: Vec<&str> = q.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, ["a.mp4", "b.mp4"]);
    }

    #[test]
    fn empty_input_is_empty_queue() {
        let q = FileQueue::create(Vec::<PathBuf>::new(), false);
        assert!(q.is_empty());
    }
}
