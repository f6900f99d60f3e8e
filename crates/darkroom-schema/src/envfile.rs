//! The flat `KEY=value` environment file that sits next to the compose file.

use crate::DocumentError;
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// The only variables the installer ever rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EnvKey {
    UploadLocation,
    DbDataLocation,
    Timezone,
    Version,
    DbPassword,
}

impl EnvKey {
    pub const ALL: [Self; 5] = [
        Self::UploadLocation,
        Self::DbDataLocation,
        Self::Timezone,
        Self::Version,
        Self::DbPassword,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::UploadLocation => "UPLOAD_LOCATION",
            Self::DbDataLocation => "DB_DATA_LOCATION",
            Self::Timezone => "TZ",
            Self::Version => "IMMICH_VERSION",
            Self::DbPassword => "DB_PASSWORD",
        }
    }
}

impl fmt::Display for EnvKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum EnvLine {
    Active { key: String, value: String, raw: String },
    Disabled { key: String, raw: String },
    Other(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentStore {
    lines: Vec<EnvLine>,
    trailing_newline: bool,
}

fn is_env_name(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn split_assignment(text: &str) -> Option<(&str, &str)> {
    let (key, value) = text.split_once('=')?;
    let key = key.trim();
    is_env_name(key).then(|| (key, value.trim()))
}

impl EnvironmentStore {
    pub fn parse(input: &str) -> Result<Self, DocumentError> {
        let mut raw_lines: Vec<&str> = input.split('\n').collect();
        let trailing_newline = input.ends_with('\n');
        if trailing_newline {
            raw_lines.pop();
        }

        let mut store = Self {
            lines: Vec::with_capacity(raw_lines.len()),
            trailing_newline,
        };
        for (idx, raw) in raw_lines.into_iter().enumerate() {
            let trimmed = raw.trim_start();
            let line = if let Some(rest) = trimmed.strip_prefix('#') {
                match split_assignment(rest.trim_start()) {
                    Some((key, _)) => EnvLine::Disabled {
                        key: key.to_owned(),
                        raw: raw.to_owned(),
                    },
                    None => EnvLine::Other(raw.to_owned()),
                }
            } else if let Some((key, value)) = split_assignment(trimmed) {
                if store.get(key).is_some() {
                    return Err(DocumentError::DuplicateEnvKey {
                        key: key.to_owned(),
                        line: idx + 1,
                    });
                }
                EnvLine::Active {
                    key: key.to_owned(),
                    value: value.to_owned(),
                    raw: raw.to_owned(),
                }
            } else {
                EnvLine::Other(raw.to_owned())
            };
            store.lines.push(line);
        }
        Ok(store)
    }

    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load the file if it exists, otherwise start from an empty store.
    pub fn load_or_default(path: &Path) -> Result<Self, DocumentError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().find_map(|l| match l {
            EnvLine::Active { key: k, value, .. } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn is_disabled(&self, key: &str) -> bool {
        self.get(key).is_none()
            && self
                .lines
                .iter()
                .any(|l| matches!(l, EnvLine::Disabled { key: k, .. } if k == key))
    }

    /// Set a documented key. An active assignment is rewritten in place; a
    /// commented-out one is re-enabled where it stands; otherwise the
    /// assignment is appended.
    pub fn set(&mut self, key: EnvKey, value: &str) {
        let name = key.as_str();
        let rendered = format!("{name}={value}");
        let replacement = EnvLine::Active {
            key: name.to_owned(),
            value: value.to_owned(),
            raw: rendered,
        };

        let active = self
            .lines
            .iter()
            .position(|l| matches!(l, EnvLine::Active { key: k, .. } if k == name));
        let disabled = || {
            self.lines
                .iter()
                .position(|l| matches!(l, EnvLine::Disabled { key: k, .. } if k == name))
        };
        match active.or_else(disabled) {
            Some(idx) => self.lines[idx] = replacement,
            None => {
                self.lines.push(replacement);
                self.trailing_newline = true;
            }
        }
    }

    /// Expand `${VAR}` and `${VAR:-default}` references against this store.
    pub fn expand(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                out.push_str(&rest[start..]);
                return out;
            };
            let expr = &after[..end];
            let (name, default) = match expr.split_once(":-") {
                Some((n, d)) => (n, Some(d)),
                None => (expr, None),
            };
            let value = self
                .get(name)
                .filter(|v| !v.is_empty())
                .or(default)
                .unwrap_or_default();
            out.push_str(value);
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        out
    }
}

impl fmt::Display for EnvironmentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<&str> = self
            .lines
            .iter()
            .map(|l| match l {
                EnvLine::Active { raw, .. } | EnvLine::Disabled { raw, .. } => raw.as_str(),
                EnvLine::Other(raw) => raw.as_str(),
            })
            .collect();
        f.write_str(&lines.join("\n"))?;
        if self.trailing_newline {
            f.write_str("\n")?;
        }
        Ok(())
    }
}
