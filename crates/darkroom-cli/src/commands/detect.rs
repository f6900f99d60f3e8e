use super::{json_pretty, Context, EXIT_SUCCESS};
use darkroom_core::{resolve, Resolution};
use darkroom_runtime::{check_compose_prereqs, format_missing, HostEvidence, SystemHost};
use darkroom_schema::AccelerationCategory;

pub fn run(ctx: &Context) -> Result<u8, String> {
    let evidence = ctx.probe();
    let mut checks = hardware_checks(&evidence);
    if std::env::var("DARKROOM_SKIP_PREREQS").as_deref() != Ok("1") {
        let missing = check_compose_prereqs(&SystemHost);
        if missing.is_empty() {
            checks.push(Check::pass("runtime", "docker compose available"));
        } else {
            checks.push(Check::fail("runtime", &format_missing(&missing)));
        }
    }
    let resolutions: Vec<Resolution> = AccelerationCategory::ALL
        .iter()
        .map(|&category| resolve(category, &evidence))
        .collect();
    print_results(&evidence, &checks, &resolutions, ctx.json)
}

fn hardware_checks(ev: &HostEvidence) -> Vec<Check> {
    let mut checks = Vec::new();
    if ev.wsl {
        checks.push(Check::info("wsl", "running as a WSL guest"));
    }

    if ev.nvidia.gpu_present {
        let name = ev.nvidia.gpu_name.as_deref().unwrap_or("NVIDIA GPU");
        checks.push(Check::pass(
            "nvidia",
            &format!("{name} ({:?} compute)", ev.nvidia.compute_tier()),
        ));
        if ev.nvidia.toolkit_waived {
            checks.push(Check::info(
                "nvidia_toolkit",
                "Container Toolkit not needed under WSL",
            ));
        } else if ev.nvidia.toolkit_present {
            checks.push(Check::pass(
                "nvidia_toolkit",
                "NVIDIA Container Toolkit registered",
            ));
        } else {
            checks.push(Check::warn(
                "nvidia_toolkit",
                "NVIDIA Container Toolkit not registered with docker",
            ));
        }
    }

    if ev.intel.present() {
        let name = ev.intel.gpu_name.as_deref().unwrap_or("Intel GPU");
        checks.push(Check::pass("intel", name));
    } else if ev.intel.pci_match {
        checks.push(Check::warn(
            "intel",
            "Intel GPU found but no /dev/dri render node",
        ));
    }

    if ev.vaapi.render_node {
        checks.push(Check::pass("vaapi", "DRI render node present"));
    }

    if ev.amd.pci_match {
        let name = ev.amd.gpu_name.as_deref().unwrap_or("AMD GPU");
        if ev.amd.kfd_node {
            checks.push(Check::pass("amd", &format!("{name} with /dev/kfd")));
        } else {
            checks.push(Check::warn("amd", &format!("{name} without /dev/kfd")));
        }
    }

    if ev.mali.any() {
        let missing = ev.mali.missing();
        if missing.is_empty() {
            checks.push(Check::pass(
                "mali",
                "Mali GPU driver, device and library present",
            ));
        } else {
            checks.push(Check::warn(
                "mali",
                &format!("Mali GPU missing: {}", missing.join(", ")),
            ));
        }
    }

    if ev.rockchip.soc_match || ev.rockchip.npu_soc_match {
        let model = ev.rockchip.soc_model.as_deref().unwrap_or("Rockchip SoC");
        checks.push(Check::pass("rockchip", model));
        if !ev.rockchip.npu_driver_version.is_empty() {
            checks.push(Check::pass("rknpu", &ev.rockchip.npu_driver_version));
        }
    }
    if ev.tonemap_library {
        checks.push(Check::info("tonemap", "OpenCL tone-mapping library present"));
    }

    if checks.iter().all(|c| c.status == "info") {
        checks.push(Check::info("hardware", "no supported accelerator detected"));
    }
    checks
}

fn print_results(
    evidence: &HostEvidence,
    checks: &[Check],
    resolutions: &[Resolution],
    json_output: bool,
) -> Result<u8, String> {
    if json_output {
        let json = serde_json::json!({
            "evidence": evidence,
            "checks": checks.iter().map(|c| serde_json::json!({
                "name": c.name,
                "status": c.status,
                "message": c.message,
            })).collect::<Vec<_>>(),
            "categories": resolutions,
        });
        println!("{}", json_pretty(&json)?);
    } else {
        println!("Darkroom Detect\n");
        for check in checks {
            let icon = match check.status.as_str() {
                "pass" => "✓",
                "fail" => "✗",
                "warn" => "⚠",
                _ => "ℹ",
            };
            println!("  {icon} {}", check.message);
        }
        for resolution in resolutions {
            println!();
            let eligible = if resolution.profiles.is_empty() {
                "none".to_owned()
            } else {
                resolution
                    .profiles
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            println!("{}: {eligible}", resolution.category);
            for advisory in &resolution.advisories {
                println!("  ⚠ {advisory}");
            }
        }
    }
    Ok(EXIT_SUCCESS)
}

struct Check {
    name: String,
    status: String,
    message: String,
}

impl Check {
    fn pass(name: &str, message: &str) -> Self {
        Self::new(name, "pass", message)
    }

    fn fail(name: &str, message: &str) -> Self {
        Self::new(name, "fail", message)
    }

    fn warn(name: &str, message: &str) -> Self {
        Self::new(name, "warn", message)
    }

    fn info(name: &str, message: &str) -> Self {
        Self::new(name, "info", message)
    }

    fn new(name: &str, status: &str, message: &str) -> Self {
        Self {
            name: name.to_owned(),
            status: status.to_owned(),
            message: message.to_owned(),
        }
    }
}
