//! Symbolic links from project directories to shared lab storage.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::errors::DomainError;
use crate::infra::config::Config;

/// A request to link `link_path` to `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRequest {
    pub target: PathBuf,
    pub link_path: PathBuf,
    pub force: bool,
}

impl LinkRequest {
    /// Resolve a request from CLI inputs and configuration.
    ///
    /// The target falls back to `link.storage_root`; the link name falls back to the target's
    /// final component and then to `link.default_name`.
    pub fn resolve(
        config: &Config,
        target: Option<PathBuf>,
        name: Option<String>,
        into: PathBuf,
        force: bool,
    ) -> Result<Self, DomainError> {
        let target = target
            .or_else(|| config.link.storage_root.clone())
            .ok_or(DomainError::MissingStorageRoot)?;
        let name = name
            .or_else(|| {
                target
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| config.link.default_name());

        Ok(Self {
            link_path: into.join(name),
            target,
            force,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    Created,
    AlreadyLinked,
    Replaced,
}

/// Create the link described by `request`.
///
/// A relative target is resolved against the working directory, so the link always stores an
/// absolute path.
pub fn create_link(request: &LinkRequest) -> Result<LinkOutcome> {
    let link_path = &request.link_path;
    let target = &std::path::absolute(&request.target)
        .with_context(|| format!("failed to resolve {}", request.target.display()))?;

    if !target.exists() {
        return Err(DomainError::LinkTargetMissing(target.clone()).into());
    }

    let mut outcome = LinkOutcome::Created;
    match fs::symlink_metadata(link_path) {
        Ok(existing) => {
            if existing.file_type().is_symlink() && points_at(link_path, target) {
                tracing::info!(link = %link_path.display(), "link already in place");
                return Ok(LinkOutcome::AlreadyLinked);
            }

            if !request.force || existing.is_dir() {
                return Err(DomainError::LinkConflict(link_path.clone()).into());
            }

            remove_link(link_path, existing.file_type().is_symlink())
                .with_context(|| format!("failed to remove {}", link_path.display()))?;
            outcome = LinkOutcome::Replaced;
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("failed to inspect {}", link_path.display()));
        }
    }

    if let Some(parent) = link_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    symlink(target, link_path).with_context(|| {
        format!(
            "failed to link {} -> {}",
            link_path.display(),
            target.display()
        )
    })?;

    tracing::info!(
        link = %link_path.display(),
        target = %target.display(),
        replaced = outcome == LinkOutcome::Replaced,
        "linked shared storage"
    );
    Ok(outcome)
}

// Dangling links never match.
fn points_at(link: &Path, target: &Path) -> bool {
    match (fs::canonicalize(link), fs::canonicalize(target)) {
        (Ok(current), Ok(wanted)) => current == wanted,
        _ => false,
    }
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

// Directory symlinks on Windows must be removed with `remove_dir`.
fn remove_link(path: &Path, is_symlink: bool) -> io::Result<()> {
    if cfg!(windows) && is_symlink && path.is_dir() {
        fs::remove_dir(path)
    } else {
        fs::remove_file(path)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn request(target: &Path, link: &Path, force: bool) -> LinkRequest {
        LinkRequest {
            target: target.to_path_buf(),
            link_path: link.to_path_buf(),
            force,
        }
    }

    #[test]
    fn creates_then_recognises_existing_link() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let share = temp.path().join("share");
        fs::create_dir_all(&share)?;
        let link = temp.path().join("project/shared");

        assert_eq!(create_link(&request(&share, &link, false))?, LinkOutcome::Created);
        assert_eq!(fs::read_link(&link)?, share);
        assert_eq!(
            create_link(&request(&share, &link, false))?,
            LinkOutcome::AlreadyLinked
        );
        Ok(())
    }

    #[test]
    fn relative_target_resolves_from_working_directory() -> Result<()> {
        let cwd = std::env::current_dir()?;
        let temp = tempfile::tempdir_in(&cwd)?;
        let share = temp.path().join("share/lab");
        fs::create_dir_all(&share)?;
        let relative = temp.path().strip_prefix(&cwd)?.join("share/lab");
        let link = temp.path().join("proj/lab");

        let req = request(&relative, &link, false);
        assert_eq!(create_link(&req)?, LinkOutcome::Created);
        assert!(fs::read_link(&link)?.is_absolute());
        assert_eq!(fs::canonicalize(&link)?, fs::canonicalize(&share)?);
        assert_eq!(create_link(&req)?, LinkOutcome::AlreadyLinked);
        Ok(())
    }

    #[test]
    fn missing_target_is_rejected() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let err = create_link(&request(
            &temp.path().join("unmounted"),
            &temp.path().join("shared"),
            false,
        ))
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DomainError>(),
            Some(DomainError::LinkTargetMissing(_))
        ));
        Ok(())
    }

    #[test]
    fn conflicting_path_needs_force() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let old = temp.path().join("old");
        let new = temp.path().join("new");
        fs::create_dir_all(&old)?;
        fs::create_dir_all(&new)?;
        let link = temp.path().join("shared");
        create_link(&request(&old, &link, false))?;

        let err = create_link(&request(&new, &link, false)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DomainError>(),
            Some(DomainError::LinkConflict(_))
        ));

        assert_eq!(create_link(&request(&new, &link, true))?, LinkOutcome::Replaced);
        assert_eq!(fs::read_link(&link)?, new);
        Ok(())
    }

    #[test]
    fn force_never_removes_real_directories() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let share = temp.path().join("share");
        let existing = temp.path().join("data");
        fs::create_dir_all(&share)?;
        fs::create_dir_all(&existing)?;

        assert!(create_link(&request(&share, &existing, true)).is_err());
        assert!(existing.is_dir());
        Ok(())
    }

    #[test]
    fn resolve_uses_config_fallbacks() {
        let mut config = Config::default();
        assert!(matches!(
            LinkRequest::resolve(&config, None, None, PathBuf::from("proj"), false),
            Err(DomainError::MissingStorageRoot)
        ));

        config.link.storage_root = Some(PathBuf::from("/mnt/lab/projects"));
        let resolved =
            LinkRequest::resolve(&config, None, None, PathBuf::from("proj"), false).unwrap();
        assert_eq!(resolved.target, PathBuf::from("/mnt/lab/projects"));
        assert_eq!(resolved.link_path, PathBuf::from("proj/projects"));

        let named = LinkRequest::resolve(
            &config,
            Some(PathBuf::from("/")),
            None,
            PathBuf::from("proj"),
            false,
        )
        .unwrap();
        assert_eq!(named.link_path, PathBuf::from("proj/shared"));
    }
}
