//! Atomic file replacement through a capability directory handle.
//!
//! Contents are written to a hidden sibling file that is synced and then
//! renamed over the target, so readers observe either the old or the new
//! file and never a partial one.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use cap_std::fs::{Dir, OpenOptions};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Failure to replace a file, carrying the path that was being written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WriteFailure {
    pub(crate) path: Utf8PathBuf,
    pub(crate) message: String,
}

impl WriteFailure {
    fn new(path: &Utf8Path, err: &io::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

/// Temporary sibling removed on drop unless it has been renamed into place.
struct PendingFile<'a> {
    dir: &'a Dir,
    name: String,
    committed: bool,
}

impl Drop for PendingFile<'_> {
    fn drop(&mut self) {
        if !self.committed && self.dir.remove_file(&self.name).is_err() {
            // Leftover temp files are hidden and harmless.
        }
    }
}

/// Replaces `path` inside `dir` with `contents`.
///
/// `path` must be a single file name relative to `dir`.
pub(crate) fn write_atomic(dir: &Dir, path: &Utf8Path, contents: &str) -> Result<(), WriteFailure> {
    let mut components = path.components();
    let (Some(Utf8Component::Normal(file_name)), None) = (components.next(), components.next())
    else {
        return Err(WriteFailure {
            path: path.to_path_buf(),
            message: "output path must name a file in the target directory".to_owned(),
        });
    };

    let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut pending = PendingFile {
        dir,
        name: format!(".{file_name}.tmp.{}.{counter}", std::process::id()),
        committed: false,
    };
    let tmp_path = path.with_file_name(&pending.name);

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    let mut file = dir
        .open_with(&pending.name, &options)
        .map_err(|err| WriteFailure::new(&tmp_path, &err))?;
    file.write_all(contents.as_bytes())
        .and_then(|()| file.sync_all())
        .map_err(|err| WriteFailure::new(&tmp_path, &err))?;
    drop(file);

    replace(dir, &pending.name, file_name).map_err(|err| WriteFailure::new(path, &err))?;
    pending.committed = true;

    if dir.open(".").and_then(|parent| parent.sync_all()).is_err() {
        // Directory sync is best effort.
    }
    Ok(())
}

#[cfg(windows)]
fn replace(dir: &Dir, from: &str, to: &str) -> io::Result<()> {
    match dir.remove_file(to) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }
    dir.rename(from, dir, to)
}

#[cfg(not(windows))]
fn replace(dir: &Dir, from: &str, to: &str) -> io::Result<()> {
    dir.rename(from, dir, to)
}

#[cfg(test)]
mod tests {
    use cap_std::ambient_authority;

    use super::*;

    fn scratch_dir(name: &str) -> Dir {
        let path = Utf8PathBuf::from("target")
            .join("seeded-sim-tests")
            .join(format!("{name}-{}", std::process::id()));
        let root = Dir::open_ambient_dir(".", ambient_authority()).expect("open crate dir");
        root.create_dir_all(&path).expect("create scratch dir");
        root.open_dir(&path).expect("open scratch dir")
    }

    #[test]
    fn writes_and_replaces_contents() {
        let dir = scratch_dir("atomic-replace");
        let path = Utf8Path::new("out.json");

        write_atomic(&dir, path, "first").expect("first write");
        write_atomic(&dir, path, "second").expect("second write");

        assert_eq!(dir.read_to_string(path).expect("read"), "second");
        let leftovers = dir
            .entries()
            .expect("list")
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().starts_with('.'))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn rejects_nested_paths() {
        let dir = scratch_dir("atomic-nested");
        let failure = write_atomic(&dir, Utf8Path::new("nested/out.json"), "x")
            .expect_err("nested path");
        assert_eq!(failure.path, Utf8PathBuf::from("nested/out.json"));
    }
}
