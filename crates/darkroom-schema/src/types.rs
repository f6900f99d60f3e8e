//! Acceleration categories and the closed profile set for each of them.

use crate::DocumentError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the two independent acceleration axes of the photo stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccelerationCategory {
    Transcoding,
    Inference,
}

impl AccelerationCategory {
    pub const ALL: [Self; 2] = [Self::Transcoding, Self::Inference];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transcoding => "transcoding",
            Self::Inference => "inference",
        }
    }

    /// Compose service that receives the extension reference.
    pub fn service_name(self) -> &'static str {
        match self {
            Self::Transcoding => "immich-server",
            Self::Inference => "immich-machine-learning",
        }
    }

    /// Fragment file published next to the compose file in each release.
    pub fn fragment_file(self) -> &'static str {
        match self {
            Self::Transcoding => "hwaccel.transcoding.yml",
            Self::Inference => "hwaccel.ml.yml",
        }
    }

    /// Whether applying a profile also suffixes the service image tag.
    pub fn suffixes_image_tag(self) -> bool {
        matches!(self, Self::Inference)
    }

    pub fn profiles(self) -> &'static [Profile] {
        match self {
            Self::Transcoding => &TRANSCODING_PROFILES,
            Self::Inference => &INFERENCE_PROFILES,
        }
    }
}

impl fmt::Display for AccelerationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccelerationCategory {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transcoding" | "transcode" | "video" => Ok(Self::Transcoding),
            "inference" | "ml" | "machine-learning" => Ok(Self::Inference),
            other => Err(DocumentError::UnknownCategory(other.to_owned())),
        }
    }
}

/// A named acceleration variant. The identifier doubles as the service name
/// inside the category's fragment file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Profile {
    Nvenc,
    Qsv,
    Vaapi,
    VaapiWsl,
    Rkmpp,
    Cuda,
    Rocm,
    Openvino,
    Armnn,
    Rknn,
}

const TRANSCODING_PROFILES: [Profile; 5] = [
    Profile::Nvenc,
    Profile::Qsv,
    Profile::Vaapi,
    Profile::VaapiWsl,
    Profile::Rkmpp,
];

const INFERENCE_PROFILES: [Profile; 5] = [
    Profile::Cuda,
    Profile::Rocm,
    Profile::Openvino,
    Profile::Armnn,
    Profile::Rknn,
];

impl Profile {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nvenc => "nvenc",
            Self::Qsv => "qsv",
            Self::Vaapi => "vaapi",
            Self::VaapiWsl => "vaapi-wsl",
            Self::Rkmpp => "rkmpp",
            Self::Cuda => "cuda",
            Self::Rocm => "rocm",
            Self::Openvino => "openvino",
            Self::Armnn => "armnn",
            Self::Rknn => "rknn",
        }
    }

    pub fn category(self) -> AccelerationCategory {
        match self {
            Self::Nvenc | Self::Qsv | Self::Vaapi | Self::VaapiWsl | Self::Rkmpp => {
                AccelerationCategory::Transcoding
            }
            Self::Cuda | Self::Rocm | Self::Openvino | Self::Armnn | Self::Rknn => {
                AccelerationCategory::Inference
            }
        }
    }

    /// Human-readable hardware family for menus.
    pub fn label(self) -> &'static str {
        match self {
            Self::Nvenc => "NVIDIA NVENC",
            Self::Qsv => "Intel Quick Sync",
            Self::Vaapi => "VA-API",
            Self::VaapiWsl => "VA-API (WSL)",
            Self::Rkmpp => "Rockchip MPP",
            Self::Cuda => "NVIDIA CUDA",
            Self::Rocm => "AMD ROCm",
            Self::Openvino => "Intel OpenVINO",
            Self::Armnn => "ARM Mali (ArmNN)",
            Self::Rknn => "Rockchip NPU",
        }
    }

    /// Parse an identifier, accepting only members of `category`'s closed set.
    pub fn parse_in(category: AccelerationCategory, input: &str) -> Result<Self, DocumentError> {
        let wanted = input.trim().to_ascii_lowercase();
        category
            .profiles()
            .iter()
            .copied()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| DocumentError::UnknownProfile {
                category,
                input: input.trim().to_owned(),
                expected: category
                    .profiles()
                    .iter()
                    .map(|p| p.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_profile_belongs_to_its_category_list() {
        for category in AccelerationCategory::ALL {
            for profile in category.profiles() {
                assert_eq!(profile.category(), category);
            }
        }
    }

    #[test]
    fn parse_in_rejects_other_category() {
        assert_eq!(
            Profile::parse_in(AccelerationCategory::Inference, " CUDA ").unwrap(),
            Profile::Cuda
        );
        let err = Profile::parse_in(AccelerationCategory::Transcoding, "cuda").unwrap_err();
        assert!(err.to_string().contains("nvenc, qsv, vaapi, vaapi-wsl, rkmpp"));
    }

    #[test]
    fn category_parses_aliases() {
        assert_eq!(
            "ml".parse::<AccelerationCategory>().unwrap(),
            AccelerationCategory::Inference
        );
        assert!("audio".parse::<AccelerationCategory>().is_err());
    }

    #[test]
    fn only_inference_suffixes_tags() {
        assert!(AccelerationCategory::Inference.suffixes_image_tag());
        assert!(!AccelerationCategory::Transcoding.suffixes_image_tag());
    }
}
