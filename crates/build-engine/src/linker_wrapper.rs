//! Linker Wrapper
//!
//! Static wrapper scripts placed once per project. Cargo uses them as the
//! linker for Android targets; they exec the compiler named in
//! `CROSSNDK_LINKER_CC`.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crossndk_toolchain::HostPlatform;

use crate::BuildError;

const WRAPPER_SH: &str = include_str!("../resources/linker-wrapper.sh");
const WRAPPER_BAT: &str = include_str!("../resources/linker-wrapper.bat");

/// Where the wrapper scripts live
pub fn wrapper_dir(root_build_dir: &Path) -> PathBuf {
    root_build_dir.join("linker-wrapper")
}

/// Wrapper script used on `host`
pub fn wrapper_path(dir: &Path, host: HostPlatform) -> PathBuf {
    if host.is_windows() {
        dir.join("linker-wrapper.bat")
    } else {
        dir.join("linker-wrapper.sh")
    }
}

/// Write both wrapper scripts, leaving identical existing copies untouched
pub async fn install(dir: &Path) -> Result<(), BuildError> {
    tokio::fs::create_dir_all(dir).await?;

    for (name, content) in [("linker-wrapper.sh", WRAPPER_SH), ("linker-wrapper.bat", WRAPPER_BAT)] {
        let path = dir.join(name);
        let current = tokio::fs::read_to_string(&path).await.ok();
        if current.as_deref() == Some(content) {
            debug!("Linker wrapper up to date: {:?}", path);
            continue;
        }
        tokio::fs::write(&path, content).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = tokio::fs::metadata(&path).await?.permissions();
            perms.set_mode(0o755);
            tokio::fs::set_permissions(&path, perms).await?;
        }
    }

    info!("Prepared linker wrapper in {:?}", dir);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let dir = wrapper_dir(Path::new("/proj/build"));
        assert_eq!(dir, PathBuf::from("/proj/build/linker-wrapper"));
        assert_eq!(wrapper_path(&dir, HostPlatform::Linux), dir.join("linker-wrapper.sh"));
        assert_eq!(wrapper_path(&dir, HostPlatform::Windows), dir.join("linker-wrapper.bat"));
    }

    #[tokio::test]
    async fn test_install_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let dir = wrapper_dir(root.path());

        install(&dir).await.unwrap();
        install(&dir).await.unwrap();

        let sh = tokio::fs::read_to_string(dir.join("linker-wrapper.sh")).await.unwrap();
        assert!(sh.contains("CROSSNDK_LINKER_CC"));
        assert!(dir.join("linker-wrapper.bat").exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(dir.join("linker-wrapper.sh")).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }
}
