use std::io::{self, Write};
use std::path::Path;

use tempfile::Builder;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

const TEMP_PREFIX: &str = ".racecar";

/// Replaces the file at `path` with `contents` in a single rename.
///
/// The payload is fsync'd in a sibling temporary file first, so a reader
/// racing the write sees either the previous content or the new one.
pub(crate) fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let directory = parent_directory(path)?;
    let mut file = private_builder().tempfile_in(directory)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}

/// Fails unless a file can be created next to `path`.
pub(crate) fn probe_writable(path: &Path) -> io::Result<()> {
    let directory = parent_directory(path)?;
    private_builder().tempfile_in(directory).map(drop)
}

pub(crate) fn parent_directory(path: &Path) -> io::Result<&Path> {
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "target path did not have a parent directory",
            )
        })
}

fn private_builder() -> Builder<'static, 'static> {
    let mut builder = Builder::new();
    builder.prefix(TEMP_PREFIX);
    #[cfg(unix)]
    {
        use std::fs::Permissions;
        builder.permissions(Permissions::from_mode(0o600));
    }
    builder
}
