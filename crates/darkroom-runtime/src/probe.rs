//! Capability probe: gathers evidence for each hardware acceleration family.
//!
//! The probe only reads. Absent tools, unreadable files and failing commands
//! all count as "not detected".

use crate::host::HostInspector;
use serde::Serialize;
use std::path::Path;

const NVIDIA_SMI: &str = "nvidia-smi";
const NVIDIA_TOOLKIT_COMMANDS: [&str; 2] = ["nvidia-ctk", "nvidia-container-toolkit"];
const DRI_DIR: &str = "/dev/dri";
const KFD_NODE: &str = "/dev/kfd";
const MALI_NODE: &str = "/dev/mali0";
const MALI_LIBRARY: &str = "/usr/lib/libmali.so";
const MALI_DRIVER_MARKERS: [&str; 3] = [
    "/sys/class/misc/mali0",
    "/sys/module/mali_kbase",
    "/sys/module/bifrost_kbase",
];
const RKNPU_VERSION: &str = "/sys/kernel/debug/rknpu/version";
const DEVICE_TREE_COMPATIBLE: &str = "/proc/device-tree/compatible";
const CPUINFO: &str = "/proc/cpuinfo";
const PROC_VERSION: &str = "/proc/version";
const RKNN_SOCS: [&str; 4] = ["rk3566", "rk3568", "rk3576", "rk3588"];

/// Vendor library that enables OpenCL tone-mapping for Rockchip transcoding.
pub const TONEMAP_LIBRARY: &str = "/usr/lib/aarch64-linux-gnu/libmali.so.1";

const DISPLAY_CLASSES: [&str; 3] = [
    "VGA compatible controller",
    "Display controller",
    "3D controller",
];

/// Rough CUDA compute capability bucket inferred from the marketing name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeTier {
    Supported,
    Legacy,
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NvidiaEvidence {
    pub gpu_present: bool,
    pub gpu_name: Option<String>,
    pub toolkit_present: bool,
    /// Toolkit counted as present because WSL does not need it.
    pub toolkit_waived: bool,
}

impl NvidiaEvidence {
    pub fn compute_tier(&self) -> ComputeTier {
        let Some(name) = self.gpu_name.as_deref() else {
            return ComputeTier::Unknown;
        };
        let upper = name.to_ascii_uppercase();
        const LEGACY: [&str; 8] = [
            "GTX 6", "GTX 7", "GT 6", "GT 7", "QUADRO K", "TESLA K", "GRID K", "NVS ",
        ];
        const SUPPORTED: [&str; 10] = [
            "RTX", "GTX 9", "GTX 10", "GTX 16", "GT 10", "TITAN", "TESLA", "QUADRO", "A100",
            "H100",
        ];
        if LEGACY.iter().any(|m| upper.contains(m)) {
            ComputeTier::Legacy
        } else if SUPPORTED.iter().any(|m| upper.contains(m)) {
            ComputeTier::Supported
        } else {
            ComputeTier::Unknown
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntelEvidence {
    pub render_node: bool,
    pub pci_match: bool,
    pub gpu_name: Option<String>,
}

impl IntelEvidence {
    pub fn present(&self) -> bool {
        self.render_node && self.pci_match
    }

    pub fn is_discrete(&self) -> bool {
        self.gpu_name.as_deref().is_some_and(|name| {
            ["Arc", "DG1", "DG2", "Data Center GPU"]
                .iter()
                .any(|m| name.contains(m))
        })
    }

    /// Integrated parts recent enough for OpenVINO inference.
    pub fn is_recent_integrated(&self) -> bool {
        self.gpu_name
            .as_deref()
            .is_some_and(|name| name.contains("Iris Xe"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VaapiEvidence {
    pub render_node: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AmdEvidence {
    pub pci_match: bool,
    pub gpu_name: Option<String>,
    pub kfd_node: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaliEvidence {
    pub gpu_present: bool,
    pub device_node: bool,
    pub library_present: bool,
}

impl MaliEvidence {
    pub fn any(&self) -> bool {
        self.gpu_present || self.device_node || self.library_present
    }

    /// Names of the unmet sub-requirements, in a fixed order.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.gpu_present {
            missing.push("Mali kernel driver");
        }
        if !self.device_node {
            missing.push(MALI_NODE);
        }
        if !self.library_present {
            missing.push(MALI_LIBRARY);
        }
        missing
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RockchipEvidence {
    pub soc_match: bool,
    pub soc_model: Option<String>,
    pub npu_soc_match: bool,
    pub npu_driver_version: String,
}

/// Everything the resolver needs, gathered once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HostEvidence {
    pub wsl: bool,
    pub nvidia: NvidiaEvidence,
    pub intel: IntelEvidence,
    pub vaapi: VaapiEvidence,
    pub amd: AmdEvidence,
    pub mali: MaliEvidence,
    pub rockchip: RockchipEvidence,
    pub tonemap_library: bool,
}

/// Probe every family. `wsl` overrides guest detection when set.
pub fn probe_host(host: &dyn HostInspector, wsl: Option<bool>) -> HostEvidence {
    let wsl = wsl.unwrap_or_else(|| detect_wsl(host));
    let render_node = has_render_node(host);
    let controllers = host
        .command_output("lspci", &[])
        .map(|out| display_controllers(&out))
        .unwrap_or_default();

    let evidence = HostEvidence {
        wsl,
        nvidia: probe_nvidia(host, wsl),
        intel: probe_intel(render_node, &controllers),
        vaapi: VaapiEvidence { render_node },
        amd: probe_amd(host, &controllers),
        mali: probe_mali(host),
        rockchip: probe_rockchip(host),
        tonemap_library: host.path_exists(Path::new(TONEMAP_LIBRARY)),
    };
    tracing::debug!("host evidence: {evidence:?}");
    evidence
}

fn detect_wsl(host: &dyn HostInspector) -> bool {
    host.env_var("WSL_DISTRO_NAME").is_some_and(|v| !v.is_empty())
        || host
            .read_file(Path::new(PROC_VERSION))
            .is_some_and(|v| v.to_ascii_lowercase().contains("microsoft"))
}

fn has_render_node(host: &dyn HostInspector) -> bool {
    host.list_dir(Path::new(DRI_DIR))
        .iter()
        .any(|e| e.starts_with("renderD"))
}

/// Device descriptions of display-class PCI devices from `lspci` output.
fn display_controllers(lspci: &str) -> Vec<String> {
    lspci
        .lines()
        .filter_map(|line| {
            let class = DISPLAY_CLASSES.iter().find(|c| line.contains(*c))?;
            let (_, desc) = line.split_once(&format!("{class}: "))?;
            Some(desc.trim().to_owned())
        })
        .collect()
}

fn probe_nvidia(host: &dyn HostInspector, wsl: bool) -> NvidiaEvidence {
    let query = host.command_output(NVIDIA_SMI, &["--query-gpu=name", "--format=csv,noheader"]);
    let gpu_present = query.is_some();
    let gpu_name = query
        .as_deref()
        .and_then(|out| out.lines().map(str::trim).find(|l| !l.is_empty()))
        .map(str::to_owned);

    let runtime_registered = host
        .command_output("docker", &["info", "--format", "{{json .Runtimes}}"])
        .is_some_and(|out| out.contains("nvidia"));
    let toolkit_installed = NVIDIA_TOOLKIT_COMMANDS
        .iter()
        .any(|c| host.command_exists(c));
    let toolkit_found = runtime_registered || toolkit_installed;

    NvidiaEvidence {
        gpu_present,
        gpu_name,
        toolkit_present: toolkit_found || wsl,
        toolkit_waived: wsl && !toolkit_found,
    }
}

fn probe_intel(render_node: bool, controllers: &[String]) -> IntelEvidence {
    let gpu_name = controllers.iter().find(|d| d.contains("Intel")).cloned();
    IntelEvidence {
        render_node,
        pci_match: gpu_name.is_some(),
        gpu_name,
    }
}

fn probe_amd(host: &dyn HostInspector, controllers: &[String]) -> AmdEvidence {
    let gpu_name = controllers
        .iter()
        .find(|d| d.contains("Advanced Micro Devices") || d.contains("AMD/ATI"))
        .cloned();
    AmdEvidence {
        pci_match: gpu_name.is_some(),
        gpu_name,
        kfd_node: host.path_exists(Path::new(KFD_NODE)),
    }
}

fn probe_mali(host: &dyn HostInspector) -> MaliEvidence {
    MaliEvidence {
        gpu_present: MALI_DRIVER_MARKERS
            .iter()
            .any(|p| host.path_exists(Path::new(p))),
        device_node: host.path_exists(Path::new(MALI_NODE)),
        library_present: host.path_exists(Path::new(MALI_LIBRARY)),
    }
}

fn probe_rockchip(host: &dyn HostInspector) -> RockchipEvidence {
    let compatible = host
        .read_file(Path::new(DEVICE_TREE_COMPATIBLE))
        .unwrap_or_default()
        .to_ascii_lowercase();
    let cpuinfo = host
        .read_file(Path::new(CPUINFO))
        .unwrap_or_default()
        .to_ascii_lowercase();

    let soc_model = compatible
        .split(|c: char| c == '\n' || c.is_whitespace())
        .find_map(|entry| entry.strip_prefix("rockchip,rk"))
        .map(|rest| format!("rk{rest}"));
    // Variants such as rk3588s share the base model's NPU.
    let npu_soc_match = soc_model
        .as_deref()
        .is_some_and(|model| RKNN_SOCS.iter().any(|soc| model.starts_with(*soc)));
    let npu_driver_version = host
        .read_file(Path::new(RKNPU_VERSION))
        .map(|v| v.trim().to_owned())
        .unwrap_or_default();

    RockchipEvidence {
        soc_match: compatible.contains("rockchip") || cpuinfo.contains("rockchip"),
        soc_model,
        npu_soc_match,
        npu_driver_version,
    }
}
