//! Selection controller: turns resolved profiles plus an operator directive
//! into exactly one outcome per category.

use crate::prompt::Prompter;
use crate::report::Reporter;
use crate::CoreError;
use darkroom_schema::{AccelerationCategory, Profile};
use serde::Serialize;

/// What the operator asked for before any prompt is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Directive {
    /// Decide from the resolved list, prompting as needed.
    #[default]
    Auto,
    Profile(Profile),
    Disable,
    Skip,
}

impl Directive {
    /// Parse `auto`, `skip`, `disable` or a profile identifier of `category`.
    pub fn parse(category: AccelerationCategory, input: &str) -> Result<Self, CoreError> {
        match input.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "skip" | "none" => Ok(Self::Skip),
            "disable" | "off" | "cpu" => Ok(Self::Disable),
            other => Ok(Self::Profile(Profile::parse_in(category, other)?)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "profile", rename_all = "lowercase")]
pub enum Selection {
    Apply(Profile),
    Disable,
    Skip,
}

enum MenuEntry {
    Profile(Profile),
    Manual,
    Disable,
    Skip,
}

/// Decide the outcome for one category.
///
/// An explicit directive wins without prompting. Otherwise an empty list
/// offers manual entry, a single profile asks for confirmation, and several
/// profiles show a menu that re-prompts until a valid entry is chosen.
pub fn select(
    category: AccelerationCategory,
    resolved: &[Profile],
    directive: Directive,
    prompter: &dyn Prompter,
    reporter: &dyn Reporter,
) -> Result<Selection, CoreError> {
    match directive {
        Directive::Disable => return Ok(Selection::Disable),
        Directive::Skip => return Ok(Selection::Skip),
        Directive::Profile(profile) => {
            if !resolved.contains(&profile) {
                reporter.advisory(&format!(
                    "{profile} was not detected as usable on this host; applying it anyway"
                ));
            }
            return Ok(Selection::Apply(profile));
        }
        Directive::Auto => {}
    }

    match resolved {
        [] => {
            reporter.info(&format!("no {category} acceleration detected"));
            let items = vec!["Enter a profile manually".to_owned(), "Skip".to_owned()];
            let choice = prompter.select(
                &format!("Configure {category} acceleration anyway?"),
                &items,
                1,
            )?;
            if choice == 0 {
                manual_entry(category, prompter, reporter)
            } else {
                Ok(Selection::Skip)
            }
        }
        [only] => {
            let apply = prompter.confirm(
                &format!("Detected {} ({only}). Enable it for {category}?", only.label()),
                true,
            )?;
            Ok(if apply {
                Selection::Apply(*only)
            } else {
                Selection::Skip
            })
        }
        many => menu(category, many, prompter, reporter),
    }
}

fn menu(
    category: AccelerationCategory,
    profiles: &[Profile],
    prompter: &dyn Prompter,
    reporter: &dyn Reporter,
) -> Result<Selection, CoreError> {
    let mut entries: Vec<MenuEntry> = profiles.iter().copied().map(MenuEntry::Profile).collect();
    entries.extend([MenuEntry::Manual, MenuEntry::Disable, MenuEntry::Skip]);
    let items: Vec<String> = entries
        .iter()
        .map(|e| match e {
            MenuEntry::Profile(p) => format!("{} ({p})", p.label()),
            MenuEntry::Manual => "Enter a profile manually".to_owned(),
            MenuEntry::Disable => "Disable acceleration".to_owned(),
            MenuEntry::Skip => "Skip".to_owned(),
        })
        .collect();

    let prompt = format!("Several {category} profiles are available. Which one?");
    loop {
        let choice = prompter.select(&prompt, &items, 0)?;
        match entries.get(choice) {
            Some(MenuEntry::Profile(p)) => return Ok(Selection::Apply(*p)),
            Some(MenuEntry::Manual) => return manual_entry(category, prompter, reporter),
            Some(MenuEntry::Disable) => return Ok(Selection::Disable),
            Some(MenuEntry::Skip) => return Ok(Selection::Skip),
            None => reporter.advisory(&format!(
                "choice {} is out of range, pick 1 to {}",
                choice + 1,
                entries.len()
            )),
        }
    }
}

/// Ask for a profile identifier until one parses. An empty answer skips.
fn manual_entry(
    category: AccelerationCategory,
    prompter: &dyn Prompter,
    reporter: &dyn Reporter,
) -> Result<Selection, CoreError> {
    let expected: Vec<&str> = category.profiles().iter().map(|p| p.as_str()).collect();
    let prompt = format!(
        "{category} profile ({}), empty to skip",
        expected.join(", ")
    );
    loop {
        let answer = prompter.input(&prompt, Some(""))?;
        if answer.trim().is_empty() {
            return Ok(Selection::Skip);
        }
        match Profile::parse_in(category, &answer) {
            Ok(profile) => return Ok(Selection::Apply(profile)),
            Err(e) => reporter.error(&e.to_string()),
        }
    }
}
