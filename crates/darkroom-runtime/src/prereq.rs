use crate::host::HostInspector;
use std::fmt;

/// A missing prerequisite with actionable install instructions.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: &'static str,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

/// The compose invocation available on this host: the `docker compose`
/// plugin, or the standalone `docker-compose` binary.
pub fn compose_command(host: &dyn HostInspector) -> Option<Vec<&'static str>> {
    if host.command_output("docker", &["compose", "version"]).is_some() {
        Some(vec!["docker", "compose"])
    } else if host.command_output("docker-compose", &["version"]).is_some() {
        Some(vec!["docker-compose"])
    } else {
        None
    }
}

/// Check everything needed to run the photo stack with compose.
/// Returns a list of missing items. Empty list means all prerequisites are met.
pub fn check_compose_prereqs(host: &dyn HostInspector) -> Vec<MissingPrereq> {
    let mut missing = Vec::new();

    if !host.command_exists("docker") {
        missing.push(MissingPrereq {
            name: "docker",
            purpose: "container runtime for the photo stack",
            install_hint: "https://docs.docker.com/engine/install/",
        });
        return missing;
    }

    if host.command_output("docker", &["info"]).is_none() {
        missing.push(MissingPrereq {
            name: "docker daemon",
            purpose: "running containers",
            install_hint: "start it with: systemctl start docker (and add your user to the docker group)",
        });
    }

    if compose_command(host).is_none() {
        missing.push(MissingPrereq {
            name: "docker compose",
            purpose: "multi-container orchestration",
            install_hint: "apt install docker-compose-plugin | dnf install docker-compose-plugin | pacman -S docker-compose",
        });
    }

    missing
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\nDarkroom needs a working container runtime to install the photo stack.");
    msg
}
