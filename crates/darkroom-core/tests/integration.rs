//! End-to-end behavior of configure, apply and disable against a scratch
//! install directory and a local release mirror.

use darkroom_core::{
    resolve, Answer, AssumeYes, CategoryResult, Directive, Engine, InstallLayout, Level,
    MemoryReporter, Prompter, ScriptedPrompter, Selection,
};
use darkroom_remote::DirSource;
use darkroom_runtime::{probe_host, HostEvidence, MockHost, NvidiaEvidence, RockchipEvidence};
use darkroom_schema::{content_digest, AccelerationCategory, ManifestDocument, Profile};
use std::fs;

const COMPOSE: &str = include_str!("fixtures/docker-compose.yml");
const TRANSCODING: &str = include_str!("fixtures/hwaccel.transcoding.yml");
const ML: &str = include_str!("fixtures/hwaccel.ml.yml");

struct Env {
    install: tempfile::TempDir,
    source: DirSource,
    _release: tempfile::TempDir,
    reporter: MemoryReporter,
}

impl Env {
    fn new(compose: &str) -> Self {
        let install = tempfile::tempdir().unwrap();
        let release = tempfile::tempdir().unwrap();
        fs::write(install.path().join("docker-compose.yml"), compose).unwrap();
        fs::write(release.path().join("hwaccel.transcoding.yml"), TRANSCODING).unwrap();
        fs::write(release.path().join("hwaccel.ml.yml"), ML).unwrap();
        Self {
            source: DirSource::new(release.path()),
            install,
            _release: release,
            reporter: MemoryReporter::new(),
        }
    }

    fn engine<'a>(&'a self, prompter: &'a dyn Prompter) -> Engine<'a> {
        Engine::new(
            InstallLayout::new(self.install.path()),
            &self.source,
            prompter,
            &self.reporter,
        )
    }

    fn compose(&self) -> String {
        fs::read_to_string(self.install.path().join("docker-compose.yml")).unwrap()
    }

    fn exists(&self, name: &str) -> bool {
        self.install.path().join(name).exists()
    }
}

fn ml_image(compose: &str) -> String {
    ManifestDocument::parse(compose)
        .unwrap()
        .service("immich-machine-learning")
        .unwrap()
        .image()
        .unwrap()
}

#[test]
fn apply_twice_matches_single_apply_for_every_profile() {
    for category in AccelerationCategory::ALL {
        for &profile in category.profiles() {
            let env = Env::new(COMPOSE);
            let engine = env.engine(&AssumeYes);
            engine.apply(profile, &HostEvidence::default()).unwrap();
            let once = env.compose();
            engine.apply(profile, &HostEvidence::default()).unwrap();
            assert_eq!(env.compose(), once, "{profile} is not idempotent");
            assert_eq!(once.matches("    extends:\n").count(), 1);
        }
    }
}

#[test]
fn disable_twice_matches_single_disable() {
    for category in AccelerationCategory::ALL {
        let env = Env::new(COMPOSE);
        let engine = env.engine(&AssumeYes);
        engine
            .apply(category.profiles()[0], &HostEvidence::default())
            .unwrap();
        engine.disable(category).unwrap();
        let once = env.compose();
        engine.disable(category).unwrap();
        assert_eq!(env.compose(), once);
        assert!(!env.exists(category.fragment_file()));
    }
}

#[test]
fn switching_inference_backend_keeps_one_suffix() {
    let profiles = AccelerationCategory::Inference.profiles();
    for &first in profiles {
        for &second in profiles.iter().filter(|p| **p != first) {
            let env = Env::new(COMPOSE);
            let engine = env.engine(&AssumeYes);
            engine.apply(first, &HostEvidence::default()).unwrap();
            engine.apply(second, &HostEvidence::default()).unwrap();
            let image = ml_image(&env.compose());
            assert!(image.ends_with(&format!("release}}-{second}")), "{image}");
            assert!(!image.contains(&format!("-{first}")), "{image}");
        }
    }
}

#[test]
fn toolkit_gated_family_is_excluded_with_advisory() {
    let evidence = HostEvidence {
        nvidia: NvidiaEvidence {
            gpu_present: true,
            gpu_name: Some("NVIDIA GeForce RTX 4090".into()),
            toolkit_present: false,
            toolkit_waived: false,
        },
        ..HostEvidence::default()
    };
    let transcoding = resolve(AccelerationCategory::Transcoding, &evidence);
    assert!(!transcoding.profiles.contains(&Profile::Nvenc));
    assert_eq!(transcoding.advisories.len(), 1);
    let inference = resolve(AccelerationCategory::Inference, &evidence);
    assert!(!inference.profiles.contains(&Profile::Cuda));
    assert_eq!(inference.advisories.len(), 1);
}

#[test]
fn rockchip_npu_without_driver_version_excludes_rknn() {
    let evidence = HostEvidence {
        rockchip: RockchipEvidence {
            soc_match: true,
            soc_model: Some("rk3588".into()),
            npu_soc_match: true,
            npu_driver_version: String::new(),
        },
        ..HostEvidence::default()
    };
    let resolution = resolve(AccelerationCategory::Inference, &evidence);
    assert!(!resolution.profiles.contains(&Profile::Rknn));
    assert!(!resolution.advisories.is_empty());
}

#[test]
fn mali_host_applies_armnn_to_bare_service() {
    let compose = "\
services:
  immich-machine-learning:
    container_name: immich_machine_learning
    image: ghcr.io/immich-app/immich-machine-learning:release
";
    let env = Env::new(compose);
    let host = MockHost::new()
        .with_path("/sys/module/mali_kbase")
        .with_path("/dev/mali0")
        .with_path("/usr/lib/libmali.so");
    let evidence = probe_host(&host, Some(false));
    let engine = env.engine(&AssumeYes);

    let outcome = engine
        .configure(AccelerationCategory::Inference, Directive::Auto, &evidence)
        .unwrap();
    assert_eq!(outcome.eligible, vec![Profile::Armnn]);
    assert_eq!(outcome.selection, Selection::Apply(Profile::Armnn));

    let written = env.compose();
    let doc = ManifestDocument::parse(&written).unwrap();
    let block = doc.service("immich-machine-learning").unwrap();
    let refs: Vec<_> = block.extensions().collect();
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].service(), Some("armnn"));
    assert_eq!(refs[0].file(), Some("hwaccel.ml.yml"));
    assert!(block.image().unwrap().ends_with("-armnn"));
    assert!(env.exists("hwaccel.ml.yml"));
}

#[test]
fn declining_replacement_keeps_nvenc() {
    let env = Env::new(COMPOSE);
    env.engine(&AssumeYes)
        .apply(Profile::Nvenc, &HostEvidence::default())
        .unwrap();
    let before = env.compose();

    let evidence = HostEvidence {
        nvidia: NvidiaEvidence {
            gpu_present: true,
            toolkit_present: true,
            ..NvidiaEvidence::default()
        },
        intel: darkroom_runtime::IntelEvidence {
            render_node: true,
            pci_match: true,
            gpu_name: Some("Intel Corporation Alder Lake-S GT1 [UHD Graphics 730]".into()),
        },
        ..HostEvidence::default()
    };
    // Menu: nvenc, qsv, manual, disable, skip. Pick qsv, then refuse the replace.
    let prompter = ScriptedPrompter::new([Answer::Select(1), Answer::Confirm(false)]);
    let outcome = env
        .engine(&prompter)
        .configure(AccelerationCategory::Transcoding, Directive::Auto, &evidence)
        .unwrap();

    assert_eq!(outcome.eligible, vec![Profile::Nvenc, Profile::Qsv]);
    assert_eq!(
        outcome.result,
        CategoryResult::ApplyDeclined {
            existing: "nvenc".into()
        }
    );
    let after = env.compose();
    assert_eq!(after, before);
    let doc = ManifestDocument::parse(&after).unwrap();
    let active = doc
        .service("immich-server")
        .unwrap()
        .active_extension()
        .unwrap();
    assert_eq!(active.service(), Some("nvenc"));
}

#[test]
fn disable_with_nothing_leaves_file_untouched() {
    let env = Env::new(COMPOSE);
    let prompter = ScriptedPrompter::default();
    let path = env.install.path().join("docker-compose.yml");
    let before = content_digest(&fs::read_to_string(&path).unwrap());

    for category in AccelerationCategory::ALL {
        let outcome = env
            .engine(&prompter)
            .configure(category, Directive::Disable, &HostEvidence::default())
            .unwrap();
        assert_eq!(outcome.result, CategoryResult::NothingToDisable);
    }

    assert_eq!(content_digest(&fs::read_to_string(&path).unwrap()), before);
    assert!(prompter.asked().is_empty());
    assert_eq!(env.reporter.count(Level::Info), 2);
}
