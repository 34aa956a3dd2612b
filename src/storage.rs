// ABOUTME: Atomic file writes via write-temp-then-rename
// ABOUTME: Readers never observe a partially written file

use crate::Result;
use rand::Rng;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Temp path in the same directory as `path`, so the final rename never
/// crosses a filesystem boundary.
fn temp_sibling(path: &Path) -> PathBuf {
    let random: u32 = rand::thread_rng().gen();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".into());
    path.with_file_name(format!(".{}.{:x}.part", name, random))
}

/// Create `path`'s content through `fill` in a temp file, then rename it
/// into place. The temp file is removed if `fill` fails.
pub fn write_atomic_with<T>(path: &Path, fill: impl FnOnce(&mut File) -> Result<T>) -> Result<T> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = temp_sibling(path);
    let mut file = File::create(&tmp_path)?;

    let outcome = fill(&mut file).and_then(|value| {
        file.flush()?;
        file.sync_all()?;
        Ok(value)
    });

    match outcome {
        Ok(value) => {
            drop(file);
            fs::rename(&tmp_path, path)?;
            Ok(value)
        }
        Err(e) => {
            drop(file);
            let _ = fs::remove_file(&tmp_path);
            Err(e)
        }
    }
}

/// Atomically replace `path` with `content`, readable only by the owner.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    write_atomic_with(path, |file| {
        file.write_all(content)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    })
}

/// Remove `path`. Returns whether anything was there.
pub fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Create `dir` (and parents) restricted to the owner.
pub fn ensure_private_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
    }
    Ok(())
}
