use crate::install::{self, InstallOptions, InstallReport};
use crate::layout::InstallLayout;
use crate::mutate::{ApplyOutcome, DisableOutcome, Mutator};
use crate::prompt::Prompter;
use crate::report::Reporter;
use crate::resolve::resolve;
use crate::select::{select, Directive, Selection};
use crate::CoreError;
use darkroom_remote::ResourceSource;
use darkroom_runtime::HostEvidence;
use darkroom_schema::{AccelerationCategory, Profile};
use serde::Serialize;

/// Final state of one category after a configure pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CategoryResult {
    Applied { profile: Profile, changed: bool },
    ApplyDeclined { existing: String },
    Disabled,
    NothingToDisable,
    DisableDeclined,
    Skipped,
}

impl From<ApplyOutcome> for CategoryResult {
    fn from(outcome: ApplyOutcome) -> Self {
        match outcome {
            ApplyOutcome::Applied { profile, changed } => Self::Applied { profile, changed },
            ApplyOutcome::Declined { existing } => Self::ApplyDeclined { existing },
        }
    }
}

impl From<DisableOutcome> for CategoryResult {
    fn from(outcome: DisableOutcome) -> Self {
        match outcome {
            DisableOutcome::Disabled => Self::Disabled,
            DisableOutcome::NothingToDisable => Self::NothingToDisable,
            DisableOutcome::Declined => Self::DisableDeclined,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryOutcome {
    pub category: AccelerationCategory,
    pub eligible: Vec<Profile>,
    pub advisories: Vec<String>,
    pub selection: Selection,
    pub result: CategoryResult,
}

/// Runs resolve, select and mutate for one install directory.
pub struct Engine<'a> {
    layout: InstallLayout,
    source: &'a dyn ResourceSource,
    prompter: &'a dyn Prompter,
    reporter: &'a dyn Reporter,
}

impl<'a> Engine<'a> {
    pub fn new(
        layout: InstallLayout,
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

    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    fn mutator(&self) -> Mutator<'_> {
        Mutator::new(&self.layout, self.source, self.prompter, self.reporter)
    }

    pub fn install(&self, options: &InstallOptions) -> Result<InstallReport, CoreError> {
        install::install(
            &self.layout,
            self.source,
            self.prompter,
            self.reporter,
            options,
        )
    }

    /// One full pass for `category`. A disable directive goes straight to
    /// removal without looking at the evidence.
    pub fn configure(
        &self,
        category: AccelerationCategory,
        directive: Directive,
        evidence: &HostEvidence,
    ) -> Result<CategoryOutcome, CoreError> {
        let (eligible, advisories) = if directive == Directive::Disable {
            (Vec::new(), Vec::new())
        } else {
            let resolution = resolve(category, evidence);
            for advisory in &resolution.advisories {
                self.reporter.advisory(advisory);
            }
            (resolution.profiles, resolution.advisories)
        };

        let selection = select(category, &eligible, directive, self.prompter, self.reporter)?;
        tracing::debug!("{category}: selected {selection:?}");
        let result = match selection {
            Selection::Apply(profile) => self.apply(profile, evidence)?.into(),
            Selection::Disable => self.disable(category)?.into(),
            Selection::Skip => {
                self.reporter
                    .info(&format!("leaving {category} acceleration unchanged"));
                CategoryResult::Skipped
            }
        };

        Ok(CategoryOutcome {
            category,
            eligible,
            advisories,
            selection,
            result,
        })
    }

    pub fn apply(
        &self,
        profile: Profile,
        evidence: &HostEvidence,
    ) -> Result<ApplyOutcome, CoreError> {
        self.mutator()
            .apply(profile, evidence)
            .inspect_err(|e| self.advise_manual_retrieval(e))
    }

    pub fn disable(&self, category: AccelerationCategory) -> Result<DisableOutcome, CoreError> {
        self.mutator().disable(category)
    }

    fn advise_manual_retrieval(&self, error: &CoreError) {
        if let CoreError::Fetch { name, location, .. } = error {
            self.reporter.error(&format!(
                "could not download {name} from {location}; fetch it manually into {} and run again",
                self.layout.root().display()
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::{Answer, AssumeYes, ScriptedPrompter};
    use crate::report::{Level, MemoryReporter};
    use darkroom_remote::DirSource;
    use darkroom_runtime::{NvidiaEvidence, VaapiEvidence};
    use std::fs;

    const COMPOSE: &str = include_str!("../tests/fixtures/docker-compose.yml");
    const TRANSCODING: &str = include_str!("../tests/fixtures/hwaccel.transcoding.yml");

    #[test]
    fn configure_single_profile_applies() {
        let install = tempfile::tempdir().unwrap();
        let release = tempfile::tempdir().unwrap();
        fs::write(install.path().join("docker-compose.yml"), COMPOSE).unwrap();
        fs::write(release.path().join("hwaccel.transcoding.yml"), TRANSCODING).unwrap();
        let source = DirSource::new(release.path());
        let reporter = MemoryReporter::new();
        let engine = Engine::new(
            InstallLayout::new(install.path()),
            &source,
            &AssumeYes,
            &reporter,
        );
        let ev = HostEvidence {
            vaapi: VaapiEvidence { render_node: true },
            ..HostEvidence::default()
        };
        let outcome = engine
            .configure(AccelerationCategory::Transcoding, Directive::Auto, &ev)
            .unwrap();
        assert_eq!(outcome.eligible, vec![Profile::Vaapi]);
        assert_eq!(outcome.selection, Selection::Apply(Profile::Vaapi));
        assert_eq!(
            outcome.result,
            CategoryResult::Applied {
                profile: Profile::Vaapi,
                changed: true
            }
        );
    }

    #[test]
    fn configure_reports_advisories_and_skips() {
        let install = tempfile::tempdir().unwrap();
        fs::write(install.path().join("docker-compose.yml"), COMPOSE).unwrap();
        let source = DirSource::new(install.path());
        let reporter = MemoryReporter::new();
        let prompter = ScriptedPrompter::new([Answer::Select(1)]);
        let engine = Engine::new(
            InstallLayout::new(install.path()),
            &source,
            &prompter,
            &reporter,
        );
        let ev = HostEvidence {
            nvidia: NvidiaEvidence {
                gpu_present: true,
                ..NvidiaEvidence::default()
            },
            ..HostEvidence::default()
        };
        let outcome = engine
            .configure(AccelerationCategory::Inference, Directive::Auto, &ev)
            .unwrap();
        assert!(outcome.eligible.is_empty());
        assert_eq!(outcome.advisories.len(), 1);
        assert_eq!(outcome.result, CategoryResult::Skipped);
        assert!(reporter.contains(Level::Advisory, "Container Toolkit"));
        assert_eq!(
            fs::read_to_string(install.path().join("docker-compose.yml")).unwrap(),
            COMPOSE
        );
    }

    #[test]
    fn fetch_failure_advises_manual_download() {
        let install = tempfile::tempdir().unwrap();
        let empty = tempfile::tempdir().unwrap();
        fs::write(install.path().join("docker-compose.yml"), COMPOSE).unwrap();
        let source = DirSource::new(empty.path());
        let reporter = MemoryReporter::new();
        let engine = Engine::new(
            InstallLayout::new(install.path()),
            &source,
            &AssumeYes,
            &reporter,
        );
        let err = engine
            .configure(
                AccelerationCategory::Inference,
                Directive::Profile(Profile::Cuda),
                &HostEvidence::default(),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Fetch { .. }));
        assert!(reporter.contains(Level::Error, "fetch it manually"));
    }

    #[test]
    fn outcomes_serialize_with_stable_tags() {
        let applied = serde_json::to_value(CategoryResult::Applied {
            profile: Profile::VaapiWsl,
            changed: false,
        })
        .unwrap();
        assert_eq!(applied["result"], "applied");
        assert_eq!(applied["profile"], "vaapi-wsl");
        let nothing = serde_json::to_value(CategoryResult::NothingToDisable).unwrap();
        assert_eq!(nothing["result"], "nothing_to_disable");
        let selection = serde_json::to_value(Selection::Apply(Profile::Rknn)).unwrap();
        assert_eq!(selection["action"], "apply");
        assert_eq!(selection["profile"], "rknn");
    }
}
