//! Thin wrappers around the mount and umount tools.
//!
//! The argument list is `-o opt1 -o opt2 ... -t fstype device mountpoint`,
//! one `-o` per option in caller order. A nonzero exit surfaces the trimmed
//! stderr as a [`MountError`].

use std::path::Path;

use tracing::trace;

use crate::error::MountError;
use crate::process::Cmd;

/// Mount `device` at `mountpoint`.
pub fn mount(
    device: &str,
    mountpoint: &Path,
    fstype: &str,
    options: &[String],
) -> Result<(), MountError> {
    trace!(device, mountpoint = %mountpoint.display(), fstype, ?options, "mount");

    let args = mount_args(device, mountpoint, fstype, options);
    let result = Cmd::new("mount")
        .args(args)
        .allow_fail()
        .run()
        .map_err(|err| MountError(format!("mount failed: {err:#}")))?;

    if !result.success() {
        return Err(MountError(format!(
            "mount failed: {}.",
            result.stderr_trimmed()
        )));
    }
    Ok(())
}

/// Mount an NFS export `host:dir` at `mountpoint`.
pub fn nfs_mount(
    host: &str,
    dir: &str,
    mountpoint: &Path,
    options: &[String],
) -> Result<(), MountError> {
    mount(&format!("{host}:{dir}"), mountpoint, "nfs", options)
}

/// Unmount `mountpoint`.
pub fn umount(mountpoint: &Path) -> Result<(), MountError> {
    trace!(mountpoint = %mountpoint.display(), "umount");

    let result = Cmd::new("umount")
        .arg_path(mountpoint)
        .allow_fail()
        .run()
        .map_err(|err| MountError(format!("umount failed: {err:#}")))?;

    if !result.success() {
        return Err(MountError(format!(
            "umount failed: {}",
            result.stderr_trimmed()
        )));
    }
    Ok(())
}

fn mount_args(device: &str, mountpoint: &Path, fstype: &str, options: &[String]) -> Vec<String> {
    let mut args = Vec::new();
    for option in options {
        args.push("-o".to_string());
        args.push(option.clone());
    }
    args.push("-t".to_string());
    args.push(fstype.to_string());
    args.push(device.to_string());
    args.push(mountpoint.to_string_lossy().into_owned());
    args
}
