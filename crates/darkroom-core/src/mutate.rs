//! Manifest mutator: applies or removes an acceleration profile on the
//! compose file and the category's fragment file.
//!
//! Every operation reads the documents fresh, fetches and validates anything
//! remote, asks for confirmation, and only then writes. A declined prompt or
//! a failed fetch leaves both files untouched.

use crate::advice;
use crate::layout::{write_if_changed, InstallLayout};
use crate::prompt::Prompter;
use crate::report::Reporter;
use crate::CoreError;
use darkroom_remote::ResourceSource;
use darkroom_runtime::HostEvidence;
use darkroom_schema::{
    AccelerationCategory, DocumentError, EnvironmentStore, ManifestDocument, Profile,
};
use serde::Serialize;
use std::fs;

const TONEMAP_MARKER: &str = "tonemapping";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ApplyOutcome {
    Applied { profile: Profile, changed: bool },
    /// The operator kept the reference that was already there.
    Declined { existing: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisableOutcome {
    Disabled,
    NothingToDisable,
    Declined,
}

pub struct Mutator<'a> {
    layout: &'a InstallLayout,
    source: &'a dyn ResourceSource,
    prompter: &'a dyn Prompter,
    reporter: &'a dyn Reporter,
}

impl<'a> Mutator<'a> {
    pub fn new(
        layout: &'a InstallLayout,
        source: &'a dyn ResourceSource,
        prompter: &'a dyn Prompter,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            layout,
            source,
            prompter,
            reporter,
        }
    }

    /// Attach `profile` to its category's service.
    pub fn apply(
        &self,
        profile: Profile,
        evidence: &HostEvidence,
    ) -> Result<ApplyOutcome, CoreError> {
        let category = profile.category();
        let fragment_name = category.fragment_file();
        let fragment = self.fetch_fragment(profile, evidence)?;

        let compose_path = self.layout.compose_file();
        let mut doc = ManifestDocument::load(&compose_path)?;
        let service = category.service_name();
        let block = doc
            .service(service)
            .ok_or_else(|| DocumentError::ServiceNotFound(service.to_owned()))?;

        if let Some(existing) = block.active_extension() {
            let same = existing.service() == Some(profile.as_str())
                && existing.file() == Some(fragment_name);
            if !same {
                let current = existing.service().unwrap_or("unknown").to_owned();
                self.reporter.advisory(&format!(
                    "{service} already extends '{current}' from {}",
                    existing.file().unwrap_or("an unnamed file")
                ));
                let replace = self
                    .prompter
                    .confirm(&format!("Replace '{current}' with '{profile}'?"), false)?;
                if !replace {
                    self.reporter
                        .info(&format!("keeping '{current}' for {category}"));
                    return Ok(ApplyOutcome::Declined { existing: current });
                }
            }
        }

        let block = doc.service_mut(service)?;
        block.set_extension(fragment_name, profile.as_str());
        if category.suffixes_image_tag() {
            let image = block
                .image()
                .ok_or_else(|| DocumentError::MissingImage(service.to_owned()))?;
            let suffixed = with_backend_suffix(&image, profile);
            if suffixed != image {
                block.set_image(&suffixed)?;
            }
        }
        for volume in block.named_volume_refs() {
            if doc.ensure_volume(&volume) {
                tracing::debug!("declared missing volume '{volume}'");
            }
        }

        let fragment_changed =
            write_if_changed(&self.layout.fragment_file(category), &fragment)?;
        let compose_changed = write_if_changed(&compose_path, &doc.to_string())?;
        let changed = fragment_changed || compose_changed;

        if changed {
            self.reporter
                .success(&format!("{category} acceleration set to {profile}"));
        } else {
            self.reporter
                .info(&format!("{category} acceleration already set to {profile}"));
        }
        for line in advice::for_profile(profile, evidence) {
            self.reporter.info(&line);
        }
        if category.suffixes_image_tag() {
            self.preview_image(&doc, service)?;
        }

        Ok(ApplyOutcome::Applied { profile, changed })
    }

    /// Remove whatever acceleration the category currently has.
    pub fn disable(&self, category: AccelerationCategory) -> Result<DisableOutcome, CoreError> {
        let compose_path = self.layout.compose_file();
        let fragment_path = self.layout.fragment_file(category);
        let service = category.service_name();
        let mut doc = ManifestDocument::load(&compose_path)?;
        let block = doc
            .service(service)
            .ok_or_else(|| DocumentError::ServiceNotFound(service.to_owned()))?;

        let has_reference = block.active_extension().is_some();
        let has_fragment = fragment_path.exists();
        let bare_image = match block.image() {
            Some(image) if category.suffixes_image_tag() => {
                let bare = strip_backend_suffix(&image);
                (bare != image).then_some(bare)
            }
            _ => None,
        };

        if !has_reference && !has_fragment && bare_image.is_none() {
            self.reporter
                .info(&format!("nothing to disable for {category}"));
            return Ok(DisableOutcome::NothingToDisable);
        }

        let mut pending = Vec::new();
        if has_reference {
            pending.push(format!("the extends reference on {service}"));
        }
        if has_fragment {
            pending.push(category.fragment_file().to_owned());
        }
        if bare_image.is_some() {
            pending.push("the backend suffix on the image tag".to_owned());
        }
        self.reporter
            .advisory(&format!("this removes {}", pending.join(" and ")));
        if !self
            .prompter
            .confirm(&format!("Disable {category} acceleration?"), false)?
        {
            self.reporter
                .info(&format!("{category} acceleration left as is"));
            return Ok(DisableOutcome::Declined);
        }

        let block = doc.service_mut(service)?;
        block.remove_extensions(false);
        if let Some(bare) = &bare_image {
            block.set_image(bare)?;
        }
        write_if_changed(&compose_path, &doc.to_string())?;
        if has_fragment {
            fs::remove_file(&fragment_path)?;
            tracing::debug!("removed {}", fragment_path.display());
        }

        self.reporter
            .success(&format!("{category} acceleration disabled"));
        Ok(DisableOutcome::Disabled)
    }

    /// Fetch the category fragment and check it defines `profile`. For
    /// rkmpp the tone-mapping mounts are enabled when the library exists.
    fn fetch_fragment(
        &self,
        profile: Profile,
        evidence: &HostEvidence,
    ) -> Result<String, CoreError> {
        let name = profile.category().fragment_file();
        let text = self
            .source
            .fetch_text(name)
            .map_err(|error| CoreError::Fetch {
                name: name.to_owned(),
                location: self.source.describe(),
                error,
            })?;

        let mut fragment = ManifestDocument::parse(&text)?;
        if fragment.service(profile.as_str()).is_none() {
            return Err(CoreError::FragmentMissingProfile {
                file: name.to_owned(),
                profile: profile.as_str().to_owned(),
                defined: fragment.service_names().join(", "),
            });
        }

        if profile != Profile::Rkmpp {
            return Ok(text);
        }
        if !evidence.tonemap_library {
            self.reporter.advisory(&format!(
                "{} not found; OpenCL tone-mapping stays disabled",
                darkroom_runtime::TONEMAP_LIBRARY
            ));
            return Ok(text);
        }
        let enabled = fragment
            .service_mut(profile.as_str())?
            .uncomment_lines_containing(TONEMAP_MARKER);
        tracing::debug!("enabled {enabled} tone-mapping lines");
        Ok(fragment.to_string())
    }

    fn preview_image(&self, doc: &ManifestDocument, service: &str) -> Result<(), CoreError> {
        let Some(image) = doc.service(service).and_then(|b| b.image()) else {
            return Ok(());
        };
        let env = EnvironmentStore::load_or_default(&self.layout.env_file())?;
        self.reporter
            .info(&format!("{service} will run {}", env.expand(&image)));
        Ok(())
    }
}

/// Byte offset where the tag of `image` starts, if it has one. A colon
/// before the last `/` belongs to a registry port.
fn tag_start(image: &str) -> Option<usize> {
    let name_start = image.rfind('/').map_or(0, |i| i + 1);
    image[name_start..].find(':').map(|i| name_start + i + 1)
}

/// Remove any trailing `-<backend>` from the tag part of an image reference.
/// Stacked suffixes are all removed. Untagged references are returned as is.
pub fn strip_backend_suffix(image: &str) -> String {
    let Some(tag_start) = tag_start(image) else {
        return image.to_owned();
    };
    let mut end = image.len();
    loop {
        let current = &image[tag_start..end];
        let suffix = AccelerationCategory::Inference
            .profiles()
            .iter()
            .map(|p| format!("-{p}"))
            .find(|s| current.ends_with(s.as_str()));
        match suffix {
            Some(s) => end -= s.len(),
            None => break,
        }
    }
    image[..end].to_owned()
}

/// The image reference with exactly one backend suffix, `profile`'s. An
/// untagged reference gets `latest-<profile>`.
pub fn with_backend_suffix(image: &str, profile: Profile) -> String {
    let base = strip_backend_suffix(image);
    if tag_start(&base).is_some() {
        format!("{base}-{profile}")
    } else {
        format!("{base}:latest-{profile}")
    }
}
