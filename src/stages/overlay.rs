//! Overlay unpacker
//!
//! Copies a directory tree onto a destination path, preserving relative
//! paths and overwriting existing files unconditionally (last-unpack-wins).
//! Unpacking the same overlay twice therefore equals unpacking it once,
//! which the naturewatch plan relies on: the home overlay is staged early
//! and re-applied after package installation.

use crate::system::SystemError;
use nix::unistd::{chown, Gid, Group, Uid, User};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Resolved uid/gid for re-owning unpacked files
#[derive(Debug, Clone, Copy)]
pub struct ResolvedOwner {
    pub uid: Uid,
    pub gid: Gid,
}

/// Resolve an `owner` spec (`user` or `user:group`) against the host
///
/// When no group is given, the user's primary group is used.
pub fn resolve_owner(owner: &str) -> Result<ResolvedOwner, SystemError> {
    let (user_name, group_name) = match owner.split_once(':') {
        Some((user, group)) => (user, Some(group)),
        None => (owner, None),
    };

    let user = User::from_name(user_name)
        .map_err(|e| SystemError::Internal(format!("user lookup failed: {}", e)))?
        .ok_or_else(|| SystemError::UnknownOwner(owner.to_string()))?;

    let gid = match group_name {
        Some(group_name) => {
            Group::from_name(group_name)
                .map_err(|e| SystemError::Internal(format!("group lookup failed: {}", e)))?
                .ok_or_else(|| SystemError::UnknownOwner(owner.to_string()))?
                .gid
        }
        None => user.gid,
    };

    Ok(ResolvedOwner { uid: user.uid, gid })
}

/// Counts of filesystem entries written by an unpack
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnpackStats {
    pub files: usize,
    pub dirs: usize,
}

/// Unpack `source` into `dest`, optionally re-owning the result
///
/// `source` must exist and be a directory; `dest`'s parent must exist.
/// The owner is resolved before any file is copied so an unknown user
/// fails the step without touching the destination.
pub fn unpack(source: &Path, dest: &Path, owner: Option<&str>) -> Result<UnpackStats, SystemError> {
    if !source.is_dir() {
        return Err(SystemError::MissingSource(source.to_path_buf()));
    }
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(SystemError::MissingDestParent(parent.to_path_buf()));
        }
    }

    let resolved = owner.map(resolve_owner).transpose()?;

    fs::create_dir_all(dest)?;
    let mut stats = UnpackStats::default();
    copy_tree(source, dest, &mut stats)?;

    if let Some(resolved) = resolved {
        chown_tree(dest, resolved)?;
    }

    debug!(
        "Unpacked {} -> {} ({} files, {} dirs)",
        source.display(),
        dest.display(),
        stats.files,
        stats.dirs
    );

    Ok(stats)
}

fn copy_tree(source: &Path, dest: &Path, stats: &mut UnpackStats) -> Result<(), SystemError> {
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let target = dest.join(entry.file_name());

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
            stats.dirs += 1;
            copy_tree(&entry.path(), &target, stats)?;
        } else if file_type.is_symlink() {
            let link = fs::read_link(entry.path())?;
            if target.symlink_metadata().is_ok() {
                fs::remove_file(&target)?;
            }
            std::os::unix::fs::symlink(link, &target)?;
            stats.files += 1;
        } else {
            fs::copy(entry.path(), &target)?;
            stats.files += 1;
        }
    }
    Ok(())
}

fn chown_tree(path: &Path, owner: ResolvedOwner) -> Result<(), SystemError> {
    chown(path, Some(owner.uid), Some(owner.gid))
        .map_err(|e| SystemError::Internal(format!("chown {} failed: {}", path.display(), e)))?;

    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            chown_tree(&entry.path(), owner)?;
        } else if file_type.is_symlink() {
            // Re-own the link entry itself; the target may not exist yet
            std::os::unix::fs::lchown(
                &entry.path(),
                Some(owner.uid.as_raw()),
                Some(owner.gid.as_raw()),
            )?;
        } else {
            chown(&entry.path(), Some(owner.uid), Some(owner.gid)).map_err(|e| {
                SystemError::Internal(format!(
                    "chown {} failed: {}",
                    entry.path().display(),
                    e
                ))
            })?;
        }
    }
    Ok(())
}
