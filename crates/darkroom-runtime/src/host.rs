use std::path::Path;
use std::process::Command;

/// Read-only view of the host used by the capability probe.
///
/// Every method degrades to "absent" instead of failing, so a probe never
/// aborts because a tool or file is missing.
pub trait HostInspector {
    fn command_exists(&self, name: &str) -> bool;

    /// Stdout of a command that ran and exited successfully.
    fn command_output(&self, program: &str, args: &[&str]) -> Option<String>;

    fn path_exists(&self, path: &Path) -> bool;

    /// File contents as text; NUL separators (device tree) become newlines.
    fn read_file(&self, path: &Path) -> Option<String>;

    /// Entry names of a directory, empty when it cannot be read.
    fn list_dir(&self, path: &Path) -> Vec<String>;

    fn env_var(&self, key: &str) -> Option<String>;
}

/// The real host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHost;

impl HostInspector for SystemHost {
    fn command_exists(&self, name: &str) -> bool {
        Command::new("which")
            .arg(name)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn command_output(&self, program: &str, args: &[&str]) -> Option<String> {
        match Command::new(program).args(args).output() {
            Ok(out) if out.status.success() => {
                Some(String::from_utf8_lossy(&out.stdout).into_owned())
            }
            Ok(out) => {
                tracing::debug!(
                    "{program} {} exited with {}: {}",
                    args.join(" "),
                    out.status,
                    String::from_utf8_lossy(&out.stderr).trim()
                );
                None
            }
            Err(e) => {
                tracing::debug!("{program} could not be started: {e}");
                None
            }
        }
    }

    fn path_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_file(&self, path: &Path) -> Option<String> {
        match std::fs::read(path) {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).replace('\0', "\n")),
            Err(e) => {
                tracing::trace!("cannot read {}: {e}", path.display());
                None
            }
        }
    }

    fn list_dir(&self, path: &Path) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(path) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn env_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Host time zone: `TZ` if set, else `/etc/timezone`, else the target of
/// the `/etc/localtime` link under `zoneinfo/`.
pub fn detect_timezone(host: &dyn HostInspector) -> Option<String> {
    if let Some(tz) = host.env_var("TZ").filter(|v| !v.trim().is_empty()) {
        return Some(tz.trim().trim_start_matches(':').to_owned());
    }
    if let Some(tz) = host
        .read_file(Path::new("/etc/timezone"))
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
    {
        return Some(tz);
    }
    let link = std::fs::read_link("/etc/localtime").ok()?;
    let link = link.to_string_lossy();
    link.split_once("zoneinfo/").map(|(_, zone)| zone.to_owned())
}
