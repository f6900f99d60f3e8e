//! Profile resolution: evidence in, ordered eligible profiles out.

use darkroom_runtime::{ComputeTier, HostEvidence};
use darkroom_schema::{AccelerationCategory, Profile};
use serde::Serialize;

const NVIDIA_TOOLKIT_URL: &str =
    "https://docs.nvidia.com/datacenter/cloud-native/container-toolkit/latest/install-guide.html";

/// Eligible profiles for one category, plus why others were left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub category: AccelerationCategory,
    pub profiles: Vec<Profile>,
    pub advisories: Vec<String>,
}

impl Resolution {
    fn new(category: AccelerationCategory) -> Self {
        Self {
            category,
            profiles: Vec::new(),
            advisories: Vec::new(),
        }
    }

    fn advise(&mut self, message: String) {
        tracing::debug!("{}: {message}", self.category);
        self.advisories.push(message);
    }
}

/// Resolve in a fixed order: NVIDIA, Intel, generic VA-API, Rockchip for
/// transcoding; NVIDIA, AMD, Intel, ARM, Rockchip for inference.
pub fn resolve(category: AccelerationCategory, evidence: &HostEvidence) -> Resolution {
    match category {
        AccelerationCategory::Transcoding => resolve_transcoding(evidence),
        AccelerationCategory::Inference => resolve_inference(evidence),
    }
}

fn resolve_transcoding(ev: &HostEvidence) -> Resolution {
    let mut res = Resolution::new(AccelerationCategory::Transcoding);

    if ev.nvidia.gpu_present {
        if ev.nvidia.toolkit_present {
            res.profiles.push(Profile::Nvenc);
        } else {
            res.advise(format!(
                "NVIDIA GPU detected but the NVIDIA Container Toolkit is not installed; \
                 NVENC stays unavailable until it is ({NVIDIA_TOOLKIT_URL})"
            ));
        }
    }

    if ev.intel.present() {
        if ev.wsl {
            tracing::debug!("Intel Quick Sync is not supported under WSL");
        } else {
            res.profiles.push(Profile::Qsv);
        }
    }

    if ev.vaapi.render_node {
        res.profiles.push(if ev.wsl {
            Profile::VaapiWsl
        } else {
            Profile::Vaapi
        });
    }

    if ev.rockchip.soc_match {
        res.profiles.push(Profile::Rkmpp);
    }

    res
}

fn resolve_inference(ev: &HostEvidence) -> Resolution {
    let mut res = Resolution::new(AccelerationCategory::Inference);

    if ev.nvidia.gpu_present {
        let name = ev.nvidia.gpu_name.as_deref().unwrap_or("NVIDIA GPU");
        if !ev.nvidia.toolkit_present {
            res.advise(format!(
                "{name} detected but the NVIDIA Container Toolkit is not installed; \
                 CUDA stays unavailable until it is ({NVIDIA_TOOLKIT_URL})"
            ));
        } else {
            match ev.nvidia.compute_tier() {
                ComputeTier::Legacy => res.advise(format!(
                    "{name} looks older than compute capability 5.2, which CUDA inference requires"
                )),
                ComputeTier::Unknown => {
                    res.advise(format!(
                        "could not tell the compute capability of {name}; CUDA needs 5.2 or newer"
                    ));
                    res.profiles.push(Profile::Cuda);
                }
                ComputeTier::Supported => res.profiles.push(Profile::Cuda),
            }
        }
    }

    if ev.amd.pci_match {
        if ev.amd.kfd_node {
            res.profiles.push(Profile::Rocm);
        } else {
            res.advise(
                "AMD GPU detected but /dev/kfd is missing; ROCm needs the amdgpu kernel driver"
                    .to_owned(),
            );
        }
    }

    if ev.intel.present() && !ev.wsl {
        if ev.intel.is_discrete() || ev.intel.is_recent_integrated() {
            res.profiles.push(Profile::Openvino);
        } else {
            let name = ev.intel.gpu_name.as_deref().unwrap_or("Intel GPU");
            res.advise(format!(
                "{name} is an older integrated GPU; OpenVINO targets Arc and Iris Xe graphics"
            ));
        }
    }

    if ev.mali.any() {
        let missing = ev.mali.missing();
        if missing.is_empty() {
            res.profiles.push(Profile::Armnn);
        } else {
            res.advise(format!(
                "ARM Mali GPU partially detected; ArmNN needs: {}",
                missing.join(", ")
            ));
        }
    }

    let rk = &ev.rockchip;
    let has_driver = !rk.npu_driver_version.is_empty();
    match (rk.npu_soc_match, has_driver) {
        (true, true) => res.profiles.push(Profile::Rknn),
        (true, false) => res.advise(format!(
            "{} has an NPU but no RKNPU driver version could be read; RKNN is unavailable",
            rk.soc_model.as_deref().unwrap_or("Rockchip SoC")
        )),
        (false, true) => res.advise(
            "RKNPU driver found but the SoC is not one of RK3566, RK3568, RK3576, RK3588"
                .to_owned(),
        ),
        (false, false) => {}
    }

    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use darkroom_runtime::{
        AmdEvidence, IntelEvidence, MaliEvidence, NvidiaEvidence, RockchipEvidence,
        VaapiEvidence,
    };

    fn nvidia(toolkit: bool, name: &str) -> NvidiaEvidence {
        NvidiaEvidence {
            gpu_present: true,
            gpu_name: Some(name.to_owned()),
            toolkit_present: toolkit,
            toolkit_waived: false,
        }
    }

    fn intel(name: &str) -> IntelEvidence {
        IntelEvidence {
            render_node: true,
            pci_match: true,
            gpu_name: Some(name.to_owned()),
        }
    }

    #[test]
    fn nothing_detected_resolves_empty() {
        for category in AccelerationCategory::ALL {
            let res = resolve(category, &HostEvidence::default());
            assert!(res.profiles.is_empty());
            assert!(res.advisories.is_empty());
        }
    }

    #[test]
    fn gpu_without_toolkit_is_excluded_with_advisory() {
        let ev = HostEvidence {
            nvidia: nvidia(false, "NVIDIA GeForce RTX 3060"),
            ..HostEvidence::default()
        };
        for category in AccelerationCategory::ALL {
            let res = resolve(category, &ev);
            assert!(res.profiles.is_empty());
            assert_eq!(res.advisories.len(), 1);
            assert!(res.advisories[0].contains("Container Toolkit"));
        }
    }

    #[test]
    fn intel_host_gets_vendor_and_generic_profiles_in_order() {
        let ev = HostEvidence {
            nvidia: nvidia(true, "NVIDIA GeForce RTX 3060"),
            intel: intel("Intel Corporation DG2 [Arc A380]"),
            vaapi: VaapiEvidence { render_node: true },
            ..HostEvidence::default()
        };
        assert_eq!(
            resolve(AccelerationCategory::Transcoding, &ev).profiles,
            vec![Profile::Nvenc, Profile::Qsv, Profile::Vaapi]
        );
        assert_eq!(
            resolve(AccelerationCategory::Inference, &ev).profiles,
            vec![Profile::Cuda, Profile::Openvino]
        );
    }

    #[test]
    fn wsl_swaps_vaapi_and_suppresses_intel() {
        let ev = HostEvidence {
            wsl: true,
            intel: intel("Intel Corporation DG2 [Arc A770]"),
            vaapi: VaapiEvidence { render_node: true },
            ..HostEvidence::default()
        };
        assert_eq!(
            resolve(AccelerationCategory::Transcoding, &ev).profiles,
            vec![Profile::VaapiWsl]
        );
        assert!(resolve(AccelerationCategory::Inference, &ev)
            .profiles
            .is_empty());
    }

    #[test]
    fn legacy_nvidia_excluded_unknown_included() {
        let legacy = HostEvidence {
            nvidia: nvidia(true, "NVIDIA GeForce GTX 760"),
            ..HostEvidence::default()
        };
        let res = resolve(AccelerationCategory::Inference, &legacy);
        assert!(res.profiles.is_empty());
        assert!(res.advisories[0].contains("5.2"));

        let unknown = HostEvidence {
            nvidia: nvidia(true, "NVIDIA L4"),
            ..HostEvidence::default()
        };
        let res = resolve(AccelerationCategory::Inference, &unknown);
        assert_eq!(res.profiles, vec![Profile::Cuda]);
        assert_eq!(res.advisories.len(), 1);
    }

    #[test]
    fn old_integrated_intel_not_openvino() {
        let ev = HostEvidence {
            intel: intel("Intel Corporation CometLake-S GT2 [UHD Graphics 630]"),
            vaapi: VaapiEvidence { render_node: true },
            ..HostEvidence::default()
        };
        let res = resolve(AccelerationCategory::Inference, &ev);
        assert!(res.profiles.is_empty());
        assert!(res.advisories[0].contains("UHD Graphics 630"));
    }

    #[test]
    fn amd_requires_kfd() {
        let mut ev = HostEvidence {
            amd: AmdEvidence {
                pci_match: true,
                gpu_name: Some("Navi 21".into()),
                kfd_node: false,
            },
            ..HostEvidence::default()
        };
        assert!(resolve(AccelerationCategory::Inference, &ev)
            .profiles
            .is_empty());
        ev.amd.kfd_node = true;
        assert_eq!(
            resolve(AccelerationCategory::Inference, &ev).profiles,
            vec![Profile::Rocm]
        );
    }

    #[test]
    fn mali_needs_all_three() {
        let full = HostEvidence {
            mali: MaliEvidence {
                gpu_present: true,
                device_node: true,
                library_present: true,
            },
            ..HostEvidence::default()
        };
        assert_eq!(
            resolve(AccelerationCategory::Inference, &full).profiles,
            vec![Profile::Armnn]
        );

        let partial = HostEvidence {
            mali: MaliEvidence {
                gpu_present: true,
                device_node: false,
                library_present: true,
            },
            ..HostEvidence::default()
        };
        let res = resolve(AccelerationCategory::Inference, &partial);
        assert!(res.profiles.is_empty());
        assert_eq!(res.advisories.len(), 1);
        assert!(res.advisories[0].contains("/dev/mali0"));
        assert!(!res.advisories[0].contains("libmali"));
    }

    #[test]
    fn rknn_requires_driver_version() {
        let mut ev = HostEvidence {
            rockchip: RockchipEvidence {
                soc_match: true,
                soc_model: Some("rk3588".into()),
                npu_soc_match: true,
                npu_driver_version: String::new(),
            },
            ..HostEvidence::default()
        };
        let res = resolve(AccelerationCategory::Inference, &ev);
        assert!(!res.profiles.contains(&Profile::Rknn));
        assert!(res.advisories[0].contains("rk3588"));
        assert_eq!(
            resolve(AccelerationCategory::Transcoding, &ev).profiles,
            vec![Profile::Rkmpp]
        );

        ev.rockchip.npu_driver_version = "RKNPU driver: v0.9.8".into();
        assert_eq!(
            resolve(AccelerationCategory::Inference, &ev).profiles,
            vec![Profile::Rknn]
        );
    }
}
