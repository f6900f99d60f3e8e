//! Follow-up hints printed after a profile is applied. They never touch the
//! documents.

use darkroom_runtime::HostEvidence;
use darkroom_schema::Profile;

const TRANSCODING_SETTINGS: &str =
    "Administration > Settings > Video Transcoding Settings > Hardware Acceleration";

pub fn for_profile(profile: Profile, evidence: &HostEvidence) -> Vec<String> {
    let mut hints = Vec::new();
    match profile {
        Profile::Nvenc | Profile::Qsv | Profile::Vaapi | Profile::VaapiWsl | Profile::Rkmpp => {
            hints.push(format!(
                "select {} under {TRANSCODING_SETTINGS} once the server is running",
                transcoding_api(profile)
            ));
        }
        _ => {}
    }

    match profile {
        Profile::VaapiWsl => hints.push(
            "WSL exposes the GPU through /dev/dxg; keep the Windows graphics driver current"
                .to_owned(),
        ),
        Profile::Rkmpp if evidence.tonemap_library => {
            hints.push("OpenCL tone-mapping mounts were enabled in the fragment".to_owned());
        }
        Profile::Cuda => {
            hints.push(
                "set MACHINE_LEARNING_DEVICE_IDS in .env to pick GPUs on multi-GPU hosts"
                    .to_owned(),
            );
            if evidence.nvidia.toolkit_waived {
                hints.push(
                    "running under WSL: the Windows NVIDIA driver provides CUDA to the container"
                        .to_owned(),
                );
            }
        }
        Profile::Rocm => hints.push(
            "the ROCm image is several gigabytes and compiles models on first use; expect a slow first start"
                .to_owned(),
        ),
        Profile::Openvino => hints.push(
            "set MACHINE_LEARNING_OPENVINO_PRECISION=FP16 in .env for faster inference on Arc GPUs"
                .to_owned(),
        ),
        Profile::Armnn => {
            hints.push(
                "set MACHINE_LEARNING_ANN_FP16_TURBO=true in .env to trade some accuracy for speed"
                    .to_owned(),
            );
            hints.push(
                "the Mali firmware mount in hwaccel.ml.yml may need adjusting for your chipset"
                    .to_owned(),
            );
        }
        Profile::Rknn => {
            hints.push(
                "set MACHINE_LEARNING_RKNN_THREADS in .env to use more NPU cores (default 1)"
                    .to_owned(),
            );
            if !evidence.rockchip.npu_driver_version.is_empty() {
                hints.push(format!(
                    "detected {}",
                    evidence.rockchip.npu_driver_version
                ));
            }
        }
        _ => {}
    }
    hints
}

fn transcoding_api(profile: Profile) -> &'static str {
    match profile {
        Profile::Nvenc => "NVENC",
        Profile::Qsv => "Quick Sync",
        Profile::Rkmpp => "RKMPP",
        _ => "VAAPI",
    }
}
