//! File permission hardening for the settings database

use crate::error::{Error, Result};
use std::path::Path;

/// Restrict a file to its owner (Unix: 0o600)
///
/// The database holds ciphertext for secrets but plaintext for everything
/// else, so it should not be world-readable.
///
/// # Errors
///
/// Returns `Error::FileWrite` if the permissions cannot be changed.
#[cfg(unix)]
pub fn set_secure_file_permissions(path: &Path) -> Result<()> {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| Error::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Create a directory (and parents) restricted to its owner (Unix: 0o700)
///
/// Existing directories are left with their current permissions.
///
/// # Errors
///
/// Returns `Error::DirectoryCreate` if creation or the permission change fails.
pub fn ensure_secure_dir(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() || path.exists() {
        return Ok(());
    }

    std::fs::create_dir_all(path).map_err(|e| Error::DirectoryCreate {
        path: path.to_path_buf(),
        source: e,
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700)).map_err(|e| {
            Error::DirectoryCreate {
                path: path.to_path_buf(),
                source: e,
            }
        })?;
    }

    Ok(())
}

/// No-op on Windows (permissions managed via ACLs)
#[cfg(not(unix))]
pub fn set_secure_file_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_secure_file_permissions() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("settings.db");
        fs::write(&file_path, "").unwrap();

        set_secure_file_permissions(&file_path).unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&file_path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_ensure_secure_dir_creates_nested() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("data").join("db");

        ensure_secure_dir(&nested).unwrap();
        assert!(nested.is_dir());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&nested).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o700);
        }
    }
}
