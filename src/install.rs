//! Installing the running binary into the user's executable directory
//!
//! Stands in for a desktop install flow: when launched from somewhere else
//! (a download directory, a build tree) the app can offer to copy itself
//! into `~/.local/bin` or the platform equivalent.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

const BINARY_NAME: &str = "hojear";

/// Where an installed copy would live, if the platform has a user bin dir
#[must_use]
pub fn install_target() -> Option<PathBuf> {
    dirs::executable_dir().map(|dir| dir.join(BINARY_NAME))
}

/// True when the running binary already lives in the executable directory
#[must_use]
pub fn is_installed() -> bool {
    let Some(bin_dir) = dirs::executable_dir() else {
        // No user bin dir on this platform, nothing to offer
        return true;
    };
    let Ok(exe) = env::current_exe() else {
        return true;
    };

    let target = bin_dir.join(BINARY_NAME);
    if let (Ok(running), Ok(installed)) = (exe.canonicalize(), target.canonicalize()) {
        if running == installed {
            return true;
        }
    }

    exe.parent().is_some_and(|dir| dir == bin_dir)
}

/// Whether offering an install makes sense at all
#[must_use]
pub fn can_install() -> bool {
    install_target().is_some() && !is_installed()
}

/// Copy the running binary into place and mark it executable.
/// Staged next to the target so the final rename is atomic.
pub fn install() -> Result<PathBuf> {
    let Some(target) = install_target() else {
        bail!("No user executable directory on this platform");
    };
    let exe = env::current_exe().context("Cannot locate the running binary")?;

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let staged = target.with_extension("tmp");
    std::fs::copy(&exe, &staged)
        .with_context(|| format!("Failed to copy to {}", staged.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perm = std::fs::metadata(&staged)?.permissions();
        perm.set_mode(0o755);
        std::fs::set_permissions(&staged, perm)?;
    }

    std::fs::rename(&staged, &target)
        .with_context(|| format!("Failed to install to {}", target.display()))?;

    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_is_named_after_the_binary() {
        if let Some(target) = install_target() {
            assert_eq!(target.file_name().and_then(|n| n.to_str()), Some("hojear"));
        }
    }

    #[test]
    fn install_check_does_not_panic() {
        // Value depends on where the test binary runs from
        let _ = is_installed();
        let _ = can_install();
    }
}
