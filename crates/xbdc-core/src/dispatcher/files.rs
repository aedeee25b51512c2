//! upload, launch

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};
use walkdir::WalkDir;
use xbdc_protocol::request::{LaunchArgs, RebootArgs, UploadArgs};
use xbdc_protocol::response::{ResponsePayload, UploadEntry};
use xbdc_protocol::{CommandType, Response};

use super::Dispatcher;
use crate::device::Device;
use crate::error::{Result, XbdcError};

impl Dispatcher
{
    /// Upload every pair. A directory is uploaded recursively, mirroring its
    /// layout under the remote path.
    pub(super) fn upload(&mut self, args: &UploadArgs) -> Result<Response>
    {
        let device = self.session_mut()?.device();
        let mut entries = Vec::new();

        for pair in &args.files {
            if !pair.local_path.is_dir() {
                entries.push(upload_file(device, &pair.local_path, &pair.remote_path));
                continue;
            }
            for walked in WalkDir::new(&pair.local_path).sort_by_file_name() {
                match walked {
                    Ok(walked) if walked.file_type().is_file() => {
                        let relative = walked.path().strip_prefix(&pair.local_path).unwrap_or(walked.path());
                        let remote = join_remote(&pair.remote_path, relative);
                        entries.push(upload_file(device, walked.path(), &remote));
                    }
                    Ok(_) => {}
                    Err(err) => {
                        let local = err.path().unwrap_or(pair.local_path.as_path()).display().to_string();
                        entries.push(UploadEntry {
                            success: false,
                            local_path: local,
                            remote_path: pair.remote_path.clone(),
                            message: err.to_string(),
                        });
                    }
                }
            }
        }

        if !entries.iter().any(|entry| entry.success) {
            return Ok(Response::failure(CommandType::Upload, "No files uploaded."));
        }
        Ok(Response::with_payload(CommandType::Upload, None, ResponsePayload::Uploads(entries)))
    }

    pub(super) fn launch(&mut self, args: &LaunchArgs) -> Result<Response>
    {
        let command = format!("magicboot title=\"{}\"", args.remote_path);
        let message = match self.session_mut()?.device().send_command(&command) {
            Ok(reply) if reply.success => {
                info!(title = %args.remote_path, "title launched");
                return Ok(Response::success(
                    CommandType::Launch,
                    format!("Launched {} successfully.", args.remote_path),
                ));
            }
            Ok(reply) => reply.message,
            Err(err) => err.to_string(),
        };

        if message.contains("timed out") {
            warn!(title = %args.remote_path, "launch timed out; rebooting console");
            if let Err(err) = self.reboot(&RebootArgs::default()) {
                debug!(%err, "reboot after launch timeout failed");
            }
            return Ok(Response::failure(
                CommandType::Launch,
                format!(
                    "Failed to launch {}: Console rebooted, please reconnect and try again.",
                    args.remote_path
                ),
            ));
        }
        Ok(Response::failure(CommandType::Launch, message))
    }
}

fn upload_file(device: &mut dyn Device, local: &Path, remote: &str) -> UploadEntry
{
    let outcome = if local.is_file() {
        ensure_remote_directories(device, remote)
            .and_then(|()| fs::read(local).map_err(XbdcError::from))
            .and_then(|bytes| device.write_file(remote, &bytes))
            .map_err(|err| err.to_string())
    } else {
        Err("Local file not found.".to_string())
    };
    debug!(local = %local.display(), %remote, ok = outcome.is_ok(), "upload");

    let (success, message) = match outcome {
        Ok(()) => (true, "File uploaded.".to_string()),
        Err(message) => (false, message),
    };
    UploadEntry {
        success,
        local_path: local.display().to_string(),
        remote_path: remote.to_string(),
        message,
    }
}

/// Create each directory above `remote`, starting below its drive.
/// `E:\Games\Demo\default.xbe` creates `E:\Games` then `E:\Games\Demo`.
fn ensure_remote_directories(device: &mut dyn Device, remote: &str) -> Result<()>
{
    let mut parts: Vec<&str> = remote.split(['\\', '/']).filter(|part| !part.is_empty()).collect();
    parts.pop();
    let Some((root, directories)) = parts.split_first() else {
        return Err(XbdcError::InvalidArgument("Empty directory path.".to_string()));
    };
    if !root.ends_with(':') {
        return Err(XbdcError::InvalidArgument("Invalid remote path.".to_string()));
    }

    let mut current = (*root).to_string();
    for directory in directories {
        current = format!("{current}\\{directory}");
        device.create_directory(&current)?;
    }
    Ok(())
}

/// `root` joined with the components of a local relative path, using `\`.
fn join_remote(root: &str, relative: &Path) -> String
{
    let mut remote = root.trim_end_matches(['\\', '/']).to_string();
    for component in relative.components() {
        remote.push('\\');
        remote.push_str(&component.as_os_str().to_string_lossy());
    }
    remote
}
