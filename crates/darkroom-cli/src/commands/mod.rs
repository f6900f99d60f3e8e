pub mod accel;
pub mod completions;
pub mod detect;
pub mod disable;
pub mod install;
pub mod man_pages;
pub mod up;

use darkroom_core::{
    AssumeYes, CoreError, InstallLayout, InstallerConfig, Level, Prompter, Reporter,
};
use darkroom_remote::{source_from_config, ResourceSource, SourceConfig};
use darkroom_runtime::{probe_host, HostEvidence, SystemHost};
use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::RefCell;
use std::io::{stderr, stdin, IsTerminal};
use std::path::PathBuf;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_DOCUMENT_ERROR: u8 = 2;
pub const EXIT_RUNTIME_MISSING: u8 = 3;

/// Settings shared by every command after flags, environment and config
/// file have been merged.
pub struct Context {
    pub layout: InstallLayout,
    pub config: InstallerConfig,
    pub source: SourceConfig,
    pub json: bool,
    pub assume_yes: bool,
    pub wsl: Option<bool>,
}

impl Context {
    pub fn new(
        dir: PathBuf,
        config: InstallerConfig,
        source: SourceConfig,
        json: bool,
        assume_yes: bool,
        wsl: Option<bool>,
    ) -> Self {
        Self {
            layout: InstallLayout::new(dir),
            config,
            source,
            json,
            assume_yes,
            wsl,
        }
    }

    pub fn resource_source(&self) -> Box<dyn ResourceSource> {
        source_from_config(&self.source)
    }

    /// `--yes` confirms everything; without a terminal the defaults are taken.
    pub fn prompter(&self) -> Box<dyn Prompter> {
        if self.assume_yes {
            Box::new(AssumeYes)
        } else if stdin().is_terminal() && stderr().is_terminal() {
            Box::new(DialoguerPrompter)
        } else {
            Box::new(DefaultsPrompter)
        }
    }

    pub fn reporter(&self) -> ConsoleReporter {
        ConsoleReporter::new(self.json)
    }

    pub fn probe(&self) -> HostEvidence {
        let pb = if self.json {
            ProgressBar::hidden()
        } else {
            spinner("probing host hardware...")
        };
        let evidence = probe_host(&SystemHost, self.wsl);
        pb.finish_and_clear();
        evidence
    }

    /// Commands that edit an install need its compose file in place.
    pub fn require_install(&self) -> Result<(), String> {
        let compose = self.layout.compose_file();
        if compose.exists() {
            Ok(())
        } else {
            Err(format!(
                "document error: {} not found (run 'darkroom install' first)",
                compose.display()
            ))
        }
    }
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_spinner())
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        style("{spinner:.cyan} {msg}")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(style("{msg}"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(style("{msg}"));
    pb.finish_with_message(format!("✗ {msg}"));
}

/// Prints styled status lines on stderr and keeps them for `--json` output.
pub struct ConsoleReporter {
    quiet: bool,
    messages: RefCell<Vec<(Level, String)>>,
}

impl ConsoleReporter {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            messages: RefCell::new(Vec::new()),
        }
    }

    pub fn messages(&self) -> Vec<serde_json::Value> {
        self.messages
            .borrow()
            .iter()
            .map(|(level, message)| serde_json::json!({ "level": level, "message": message }))
            .collect()
    }
}

impl Reporter for ConsoleReporter {
    fn report(&self, level: Level, message: &str) {
        tracing::debug!("{level:?}: {message}");
        self.messages.borrow_mut().push((level, message.to_owned()));
        if !self.quiet {
            eprintln!("{}", styled(level, message));
        }
    }
}

fn styled(level: Level, message: &str) -> String {
    use console::Style;
    match level {
        Level::Info => format!("  {message}"),
        Level::Success => Style::new()
            .green()
            .apply_to(format!("✓ {message}"))
            .to_string(),
        Level::Advisory => Style::new()
            .yellow()
            .apply_to(format!("⚠ {message}"))
            .to_string(),
        Level::Error => Style::new()
            .red()
            .bold()
            .apply_to(format!("✗ {message}"))
            .to_string(),
    }
}

fn prompt_error(e: dialoguer::Error) -> CoreError {
    CoreError::Prompt(e.to_string())
}

/// Interactive terminal prompts.
pub struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, CoreError> {
        Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(prompt_error)
    }

    fn select(&self, prompt: &str, items: &[String], default: usize) -> Result<usize, CoreError> {
        Select::new()
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact()
            .map_err(prompt_error)
    }

    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String, CoreError> {
        let mut input = Input::<String>::new().with_prompt(prompt).allow_empty(true);
        if let Some(value) = default {
            input = input.default(value.to_owned());
        }
        input.interact_text().map_err(prompt_error)
    }
}

/// Non-interactive runs without `--yes`: every question takes its default,
/// so replacements and removals that default to "no" are declined.
pub struct DefaultsPrompter;

impl Prompter for DefaultsPrompter {
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, CoreError> {
        tracing::debug!("no terminal, answering {default} to '{prompt}'");
        Ok(default)
    }

    fn select(&self, prompt: &str, items: &[String], default: usize) -> Result<usize, CoreError> {
        AssumeYes.select(prompt, items, default)
    }

    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String, CoreError> {
        AssumeYes.input(prompt, default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_pretty_serializes_object() {
        let val = serde_json::json!({"key": "value"});
        let result = json_pretty(&val).unwrap();
        assert!(result.contains("\"key\""));
        assert!(result.contains("\"value\""));
    }

    #[test]
    fn defaults_prompter_declines_when_default_is_no() {
        assert!(!DefaultsPrompter.confirm("Replace it?", false).unwrap());
        assert!(DefaultsPrompter.confirm("Enable it?", true).unwrap());
        assert_eq!(
            DefaultsPrompter
                .select("Pick", &["a".to_owned(), "b".to_owned()], 1)
                .unwrap(),
            1
        );
    }

    #[test]
    fn console_reporter_records_quietly() {
        let reporter = ConsoleReporter::new(true);
        reporter.advisory("toolkit missing");
        reporter.error("download failed");
        let messages = reporter.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["level"], "advisory");
        assert_eq!(messages[1]["message"], "download failed");
    }

    #[test]
    fn missing_compose_is_a_document_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::new(
            dir.path().to_path_buf(),
            InstallerConfig::default(),
            SourceConfig::default(),
            true,
            true,
            Some(false),
        );
        let err = ctx.require_install().unwrap_err();
        assert!(err.starts_with("document error:"));
    }
}
