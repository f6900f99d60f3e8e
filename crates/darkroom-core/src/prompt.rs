//! Operator interaction seam.

use crate::CoreError;
use std::cell::RefCell;
use std::collections::VecDeque;

pub trait Prompter {
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, CoreError>;

    /// Index of the chosen item. Callers must handle out-of-range answers.
    fn select(&self, prompt: &str, items: &[String], default: usize) -> Result<usize, CoreError>;

    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String, CoreError>;
}

/// Unattended mode: confirms everything and takes menu defaults.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl Prompter for AssumeYes {
    fn confirm(&self, prompt: &str, _default: bool) -> Result<bool, CoreError> {
        tracing::debug!("assuming yes: {prompt}");
        Ok(true)
    }

    fn select(&self, prompt: &str, items: &[String], default: usize) -> Result<usize, CoreError> {
        tracing::debug!(
            "assuming default for '{prompt}': {}",
            items.get(default).map_or("<none>", String::as_str)
        );
        Ok(default)
    }

    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String, CoreError> {
        default
            .map(str::to_owned)
            .ok_or_else(|| CoreError::Prompt(format!("'{prompt}' needs an answer (no TTY)")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Confirm(bool),
    Select(usize),
    Input(String),
}

/// Replays a fixed list of answers and records every prompt it was shown.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: RefCell<VecDeque<Answer>>,
    asked: RefCell<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: RefCell::new(answers.into_iter().collect()),
            asked: RefCell::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }

    pub fn remaining(&self) -> usize {
        self.answers.borrow().len()
    }

    fn next(&self, prompt: &str) -> Result<Answer, CoreError> {
        self.asked.borrow_mut().push(prompt.to_owned());
        self.answers
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| CoreError::Prompt(format!("no scripted answer for '{prompt}'")))
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&self, prompt: &str, _default: bool) -> Result<bool, CoreError> {
        match self.next(prompt)? {
            Answer::Confirm(v) => Ok(v),
            other => Err(CoreError::Prompt(format!(
                "expected confirmation for '{prompt}', got {other:?}"
            ))),
        }
    }

    fn select(&self, prompt: &str, _items: &[String], _default: usize) -> Result<usize, CoreError> {
        match self.next(prompt)? {
            Answer::Select(v) => Ok(v),
            other => Err(CoreError::Prompt(format!(
                "expected menu choice for '{prompt}', got {other:?}"
            ))),
        }
    }

    fn input(&self, prompt: &str, _default: Option<&str>) -> Result<String, CoreError> {
        match self.next(prompt)? {
            Answer::Input(v) => Ok(v),
            other => Err(CoreError::Prompt(format!(
                "expected text for '{prompt}', got {other:?}"
            ))),
        }
    }
}
