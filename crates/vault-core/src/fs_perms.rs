use std::path::Path;

use anyhow::{Context, Result};

/// Creates `path` (and parents) if needed and restricts it to owner-only access (0700 on Unix).
pub fn ensure_private_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path)
            .with_context(|| format!("failed to stat {}", path.display()))?
            .permissions();
        perms.set_mode(0o700);
        std::fs::set_permissions(path, perms)
            .with_context(|| format!("failed to chmod {} to 0700", path.display()))?;
    }
    Ok(())
}

/// Restricts an existing file to owner-only read/write (0600 on Unix).
pub fn set_private_file_mode(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path)
            .with_context(|| format!("failed to stat {}", path.display()))?
            .permissions();
        perms.set_mode(0o600);
        std::fs::set_permissions(path, perms)
            .with_context(|| format!("failed to chmod {} to 0600", path.display()))?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_ensure_private_dir_creates_nested_path() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let nested = tempdir.path().join("a").join("b");
        ensure_private_dir(&nested).expect("create");
        assert!(nested.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn unit_set_private_file_mode_restricts_to_owner() {
        use std::os::unix::fs::PermissionsExt;
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("secret.bin");
        std::fs::write(&path, b"data").expect("write");
        set_private_file_mode(&path).expect("chmod");
        let mode = std::fs::metadata(&path).expect("stat").permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
