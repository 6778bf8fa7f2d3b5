//! Service installer (systemd)
//!
//! Moves a unit file into the service directory, sets its mode to 0644 and
//! enables it. The move is not rolled back when enabling fails: the unit
//! stays installed and a re-run can finish the job.

use crate::system::{CommandLine, CommandRunner, OutputCallback, SystemError};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_SERVICE_DIR: &str = "/etc/systemd/system";

/// Build the command line that enables a unit
pub fn enable_command(unit_name: &str) -> CommandLine {
    CommandLine::new("systemctl").arg("enable").arg(unit_name)
}

/// Install a unit file and optionally enable it
///
/// Returns the final path of the installed unit.
pub async fn install(
    runner: &dyn CommandRunner,
    unit: &str,
    service_dir: Option<&str>,
    enable: bool,
    callback: Option<&dyn OutputCallback>,
) -> Result<PathBuf, SystemError> {
    let unit_src = Path::new(unit);
    if !unit_src.is_file() {
        return Err(SystemError::MissingUnit(unit_src.to_path_buf()));
    }

    let unit_name = unit_src
        .file_name()
        .ok_or_else(|| SystemError::Internal(format!("unit path {} has no file name", unit)))?;
    let service_dir = Path::new(service_dir.unwrap_or(DEFAULT_SERVICE_DIR));
    let installed = service_dir.join(unit_name);

    move_file(unit_src, &installed)?;
    fs::set_permissions(&installed, fs::Permissions::from_mode(0o644))?;
    debug!("Installed unit {}", installed.display());

    if enable {
        let cmd = enable_command(&unit_name.to_string_lossy());
        runner.run_streaming(&cmd, callback).await?;
    }

    Ok(installed)
}

/// Move a file, falling back to copy-and-remove across filesystems
fn move_file(src: &Path, dest: &Path) -> Result<(), SystemError> {
    match fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(nix::libc::EXDEV) => {
            fs::copy(src, dest)?;
            fs::remove_file(src)?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
