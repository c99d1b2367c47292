//! Where command output lands: stdout, or a file that is replaced in one step
//! so readers never observe a half-written dataset.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Write `data` to `out`, or to stdout when no path is given.
pub fn emit(out: Option<&Path>, data: &[u8]) -> io::Result<()> {
    match out {
        Some(path) => replace_file(path, data),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(data)?;
            stdout.flush()
        }
    }
}

/// Stage `data` next to `path`, then rename it into place. The staging file
/// is removed if any step fails.
fn replace_file(path: &Path, data: &[u8]) -> io::Result<()> {
    let staging = staging_path(path)?;
    if let Some(dir) = staging.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }

    let result = fs::File::create(&staging)
        .and_then(|mut file| {
            file.write_all(data)?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&staging, path));
    if result.is_err() {
        let _ = fs::remove_file(&staging);
    }
    result
}

/// Hidden sibling of `path`, unique per process.
fn staging_path(path: &Path) -> io::Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "output path has no file name")
    })?;
    let staging_name = format!(".{}.{}.partial", name.to_string_lossy(), std::process::id());
    Ok(path.with_file_name(staging_name))
}
