//! Line-preserving model of a compose file.
//!
//! The document is split into top-level sections. The `services` section is
//! further split into [`ServiceBlock`]s, and inside each block an `extends:`
//! directive (active or commented out) is lifted into an [`ExtensionRef`].
//! Everything else is kept as the original text, so serializing an unmodified
//! document reproduces the input byte for byte.

use crate::DocumentError;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

const EXTENDS_KEY: &str = "extends:";
const INDENT_STEP: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDocument {
    sections: Vec<Section>,
    trailing_newline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Section {
    /// Preamble or any top-level section we never edit.
    Raw(Vec<String>),
    Services {
        header: String,
        leading: Vec<String>,
        blocks: Vec<ServiceBlock>,
    },
    Volumes(Vec<String>),
}

/// A named service: its header line plus the ordered lines beneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceBlock {
    name: String,
    header: String,
    body: Vec<BlockLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BlockLine {
    Text(String),
    Extension(ExtensionRef),
}

/// An `extends:` directive attaching a fragment sub-profile to a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionRef {
    file: Option<String>,
    service: Option<String>,
    active: bool,
    lines: Vec<String>,
}

impl ExtensionRef {
    /// Build an active three-line reference at the given indentation.
    pub fn new(indent: usize, file: &str, service: &str) -> Self {
        let pad = " ".repeat(indent);
        let child = " ".repeat(indent + INDENT_STEP);
        Self {
            file: Some(file.to_owned()),
            service: Some(service.to_owned()),
            active: true,
            lines: vec![
                format!("{pad}{EXTENDS_KEY}"),
                format!("{child}file: {file}"),
                format!("{child}service: {service}"),
            ],
        }
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn service(&self) -> Option<&str> {
        self.service.as_deref()
    }

    /// False for a reference that is present but commented out.
    pub fn is_active(&self) -> bool {
        self.active
    }
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

/// Text of a comment line with the `#` markers and following spaces removed.
fn comment_body(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    trimmed
        .strip_prefix('#')
        .map(|rest| rest.trim_start_matches('#').trim_start())
}

/// Value of a `key: value` line with any inline comment and quotes removed.
fn scalar(value: &str) -> String {
    let without_comment = match value.find(" #") {
        Some(idx) => &value[..idx],
        None => value,
    };
    let trimmed = without_comment.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| trimmed.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        .unwrap_or(trimmed);
    unquoted.to_owned()
}

fn key_of(line: &str) -> Option<&str> {
    if is_blank(line) || is_comment(line) {
        return None;
    }
    let trimmed = line.trim();
    let (key, _) = trimmed.split_once(':')?;
    let key = key.trim();
    (!key.is_empty() && !key.starts_with('-')).then_some(key)
}

fn child_indent(lines: &[String], fallback: usize) -> usize {
    lines
        .iter()
        .find(|l| !is_blank(l) && !is_comment(l))
        .map_or(fallback, |l| indent_of(l))
}

impl ManifestDocument {
    pub fn parse(input: &str) -> Result<Self, DocumentError> {
        let mut lines: Vec<String> = input.split('\n').map(str::to_owned).collect();
        let trailing_newline = input.ends_with('\n');
        if trailing_newline {
            lines.pop();
        }

        let mut chunks: Vec<Vec<String>> = vec![Vec::new()];
        for line in lines {
            let starts_section = indent_of(&line) == 0 && key_of(&line).is_some();
            if starts_section {
                chunks.push(Vec::new());
            }
            if let Some(chunk) = chunks.last_mut() {
                chunk.push(line);
            }
        }

        let mut sections = Vec::with_capacity(chunks.len());
        let mut seen_sections = HashSet::new();
        for (idx, chunk) in chunks.into_iter().enumerate() {
            if idx == 0 {
                if !chunk.is_empty() {
                    sections.push(Section::Raw(chunk));
                }
                continue;
            }
            let key = chunk
                .first()
                .and_then(|l| key_of(l))
                .unwrap_or_default()
                .to_owned();
            if !seen_sections.insert(key.clone()) {
                return Err(DocumentError::DuplicateSection(key));
            }
            sections.push(match key.as_str() {
                "services" => parse_services(chunk)?,
                "volumes" => {
                    check_unique_volumes(&chunk)?;
                    Section::Volumes(chunk)
                }
                _ => Section::Raw(chunk),
            });
        }

        Ok(Self {
            sections,
            trailing_newline,
        })
    }

    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn has_services(&self) -> bool {
        self.sections
            .iter()
            .any(|s| matches!(s, Section::Services { .. }))
    }

    pub fn service_names(&self) -> Vec<&str> {
        self.blocks().map(|b| b.name.as_str()).collect()
    }

    pub fn service(&self, name: &str) -> Option<&ServiceBlock> {
        self.blocks().find(|b| b.name == name)
    }

    pub fn service_mut(&mut self, name: &str) -> Result<&mut ServiceBlock, DocumentError> {
        if !self.has_services() {
            return Err(DocumentError::MissingServices);
        }
        self.sections
            .iter_mut()
            .filter_map(|s| match s {
                Section::Services { blocks, .. } => Some(blocks),
                _ => None,
            })
            .flat_map(|blocks| blocks.iter_mut())
            .find(|b| b.name == name)
            .ok_or_else(|| DocumentError::ServiceNotFound(name.to_owned()))
    }

    fn blocks(&self) -> impl Iterator<Item = &ServiceBlock> {
        self.sections
            .iter()
            .filter_map(|s| match s {
                Section::Services { blocks, .. } => Some(blocks),
                _ => None,
            })
            .flatten()
    }

    pub fn volume_names(&self) -> Vec<String> {
        self.sections
            .iter()
            .find_map(|s| match s {
                Section::Volumes(lines) => Some(volume_entries(lines)),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Declare a top-level named volume. Returns false if it already existed.
    pub fn ensure_volume(&mut self, name: &str) -> bool {
        if self.volume_names().iter().any(|v| v == name) {
            return false;
        }
        if let Some(lines) = self.sections.iter_mut().find_map(|s| match s {
            Section::Volumes(lines) => Some(lines),
            _ => None,
        }) {
            let indent = child_indent(&lines[1..], INDENT_STEP);
            let last_content = lines.iter().rposition(|l| !is_blank(l)).unwrap_or(0);
            lines.insert(last_content + 1, format!("{}{name}:", " ".repeat(indent)));
            return true;
        }

        let ends_blank = self
            .sections
            .last()
            .and_then(|s| s.lines().last().map(|l| is_blank(l)))
            .unwrap_or(true);
        if !ends_blank {
            match self.sections.last_mut() {
                Some(Section::Raw(lines) | Section::Volumes(lines)) => lines.push(String::new()),
                Some(Section::Services {
                    blocks, leading, ..
                }) => match blocks.last_mut() {
                    Some(block) => block.body.push(BlockLine::Text(String::new())),
                    None => leading.push(String::new()),
                },
                None => {}
            }
        }
        self.sections.push(Section::Volumes(vec![
            "volumes:".to_owned(),
            format!("{}{name}:", " ".repeat(INDENT_STEP)),
        ]));
        self.trailing_newline = true;
        true
    }

    /// Remove every active extension reference from the named service.
    pub fn remove_active_extension(&mut self, service: &str) -> Result<usize, DocumentError> {
        Ok(self.service_mut(service)?.remove_extensions(false))
    }
}

impl Section {
    fn lines(&self) -> Vec<String> {
        match self {
            Self::Raw(lines) | Self::Volumes(lines) => lines.clone(),
            Self::Services {
                header,
                leading,
                blocks,
            } => {
                let mut out = vec![header.clone()];
                out.extend(leading.iter().cloned());
                for block in blocks {
                    out.extend(block.lines());
                }
                out
            }
        }
    }
}

impl fmt::Display for ManifestDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.sections.iter().flat_map(Section::lines).collect();
        f.write_str(&lines.join("\n"))?;
        if self.trailing_newline {
            f.write_str("\n")?;
        }
        Ok(())
    }
}

fn volume_entries(lines: &[String]) -> Vec<String> {
    let body = lines.get(1..).unwrap_or_default();
    let indent = child_indent(body, INDENT_STEP);
    body.iter()
        .filter(|l| indent_of(l) == indent)
        .filter_map(|l| key_of(l))
        .map(str::to_owned)
        .collect()
}

fn check_unique_volumes(lines: &[String]) -> Result<(), DocumentError> {
    let mut seen = HashSet::new();
    for name in volume_entries(lines) {
        if !seen.insert(name.clone()) {
            return Err(DocumentError::DuplicateVolume(name));
        }
    }
    Ok(())
}

fn parse_services(chunk: Vec<String>) -> Result<Section, DocumentError> {
    let mut iter = chunk.into_iter();
    let header = iter.next().unwrap_or_default();
    let body: Vec<String> = iter.collect();
    let indent = child_indent(&body, INDENT_STEP);

    let mut leading = Vec::new();
    let mut raw_blocks: Vec<(String, String, Vec<String>)> = Vec::new();
    for line in body {
        let is_header = indent_of(&line) == indent && key_of(&line).is_some();
        if is_header {
            let name = key_of(&line).unwrap_or_default().to_owned();
            raw_blocks.push((name, line, Vec::new()));
        } else if let Some((_, _, lines)) = raw_blocks.last_mut() {
            lines.push(line);
        } else {
            leading.push(line);
        }
    }

    let mut seen = HashSet::new();
    let mut blocks = Vec::with_capacity(raw_blocks.len());
    for (name, header_line, lines) in raw_blocks {
        if !seen.insert(name.clone()) {
            return Err(DocumentError::DuplicateService(name));
        }
        blocks.push(ServiceBlock {
            name,
            header: header_line,
            body: parse_block_body(lines),
        });
    }

    Ok(Section::Services {
        header,
        leading,
        blocks,
    })
}

fn parse_block_body(lines: Vec<String>) -> Vec<BlockLine> {
    let mut body = Vec::with_capacity(lines.len());
    let mut i = 0;
    while i < lines.len() {
        let line = &lines[i];
        let trimmed = line.trim_start();

        if !is_comment(line) && trimmed.starts_with(EXTENDS_KEY) {
            let base = indent_of(line);
            let inline = scalar(&trimmed[EXTENDS_KEY.len()..]);
            let mut ext = ExtensionRef {
                file: None,
                service: (!inline.is_empty()).then_some(inline),
                active: true,
                lines: vec![line.clone()],
            };
            let mut j = i + 1;
            while j < lines.len() && !is_blank(&lines[j]) && indent_of(&lines[j]) > base {
                read_extension_key(&mut ext, lines[j].trim_start());
                ext.lines.push(lines[j].clone());
                j += 1;
            }
            body.push(BlockLine::Extension(ext));
            i = j;
            continue;
        }

        if let Some(text) = comment_body(line).filter(|t| t.starts_with(EXTENDS_KEY)) {
            let inline = scalar(&text[EXTENDS_KEY.len()..]);
            let mut ext = ExtensionRef {
                file: None,
                service: None,
                active: false,
                lines: vec![line.clone()],
            };
            if !inline.is_empty() && !inline.starts_with('#') {
                ext.service = Some(inline);
            }
            let mut j = i + 1;
            while let Some(next) = lines.get(j).and_then(|l| comment_body(l)) {
                if !(next.starts_with("file:") || next.starts_with("service:")) {
                    break;
                }
                read_extension_key(&mut ext, next);
                ext.lines.push(lines[j].clone());
                j += 1;
            }
            body.push(BlockLine::Extension(ext));
            i = j;
            continue;
        }

        body.push(BlockLine::Text(line.clone()));
        i += 1;
    }
    body
}

fn read_extension_key(ext: &mut ExtensionRef, text: &str) {
    if let Some(v) = text.strip_prefix("file:") {
        ext.file = Some(scalar(v));
    } else if let Some(v) = text.strip_prefix("service:") {
        ext.service = Some(scalar(v));
    }
}

impl ServiceBlock {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn lines(&self) -> Vec<String> {
        let mut out = vec![self.header.clone()];
        for line in &self.body {
            match line {
                BlockLine::Text(text) => out.push(text.clone()),
                BlockLine::Extension(ext) => out.extend(ext.lines.iter().cloned()),
            }
        }
        out
    }

    fn texts(&self) -> impl Iterator<Item = &String> {
        self.body.iter().filter_map(|l| match l {
            BlockLine::Text(t) => Some(t),
            BlockLine::Extension(_) => None,
        })
    }

    fn property_indent(&self) -> usize {
        self.texts()
            .find(|l| !is_blank(l) && !is_comment(l))
            .map_or(indent_of(&self.header) + INDENT_STEP, |l| indent_of(l))
    }

    fn property(&self, key: &str) -> Option<(usize, String)> {
        let indent = self.property_indent();
        self.body.iter().enumerate().find_map(|(idx, l)| match l {
            BlockLine::Text(t) if indent_of(t) == indent && key_of(t) == Some(key) => {
                let (_, value) = t.split_once(':')?;
                Some((idx, scalar(value)))
            }
            _ => None,
        })
    }

    pub fn extensions(&self) -> impl Iterator<Item = &ExtensionRef> {
        self.body.iter().filter_map(|l| match l {
            BlockLine::Extension(ext) => Some(ext),
            BlockLine::Text(_) => None,
        })
    }

    /// The first active extension reference, if any.
    pub fn active_extension(&self) -> Option<&ExtensionRef> {
        self.extensions().find(|e| e.active)
    }

    /// Drop active references, and commented ones too when `include_disabled`.
    pub fn remove_extensions(&mut self, include_disabled: bool) -> usize {
        let before = self.body.len();
        self.body.retain(|l| match l {
            BlockLine::Extension(ext) => !(ext.active || include_disabled),
            BlockLine::Text(_) => true,
        });
        before - self.body.len()
    }

    /// Replace every reference (active or commented) with a single active one
    /// placed directly after the `container_name` line.
    pub fn set_extension(&mut self, file: &str, service: &str) {
        self.remove_extensions(true);
        let indent = self.property_indent();
        let position = self
            .property("container_name")
            .map_or(0, |(idx, _)| idx + 1);
        self.body.insert(
            position,
            BlockLine::Extension(ExtensionRef::new(indent, file, service)),
        );
    }

    pub fn image(&self) -> Option<String> {
        self.property("image").map(|(_, v)| v)
    }

    /// Rewrite the image reference, keeping indentation and any inline comment.
    pub fn set_image(&mut self, image: &str) -> Result<(), DocumentError> {
        let (idx, old) = self
            .property("image")
            .ok_or_else(|| DocumentError::MissingImage(self.name.clone()))?;
        if let BlockLine::Text(line) = &mut self.body[idx] {
            let pad = " ".repeat(indent_of(line));
            let comment = line
                .find(" #")
                .filter(|pos| line[..*pos].contains(&old))
                .map(|pos| line[pos..].to_owned())
                .unwrap_or_default();
            *line = format!("{pad}image: {image}{comment}");
        }
        Ok(())
    }

    /// Named volumes (as opposed to bind mounts) used by this service.
    pub fn named_volume_refs(&self) -> Vec<String> {
        let indent = self.property_indent();
        let mut refs = Vec::new();
        let mut in_volumes = false;
        for line in self.texts() {
            if is_blank(line) || is_comment(line) {
                continue;
            }
            if indent_of(line) <= indent {
                in_volumes = indent_of(line) == indent && key_of(line) == Some("volumes");
                continue;
            }
            if !in_volumes {
                continue;
            }
            let Some(item) = line.trim_start().strip_prefix('-') else {
                continue;
            };
            let spec = scalar(item);
            let source = spec.split(':').next().unwrap_or_default();
            let named = !source.is_empty()
                && !source.contains(['/', '.', '$', '~'])
                && spec.contains(':')
                && !spec.contains(": ");
            if named && !refs.iter().any(|r| r == source) {
                refs.push(source.to_owned());
            }
        }
        refs
    }

    /// Uncomment every commented line in this block that mentions `marker`.
    pub fn uncomment_lines_containing(&mut self, marker: &str) -> usize {
        let mut changed = 0;
        for line in &mut self.body {
            if let BlockLine::Text(text) = line {
                if !is_comment(text) || !text.contains(marker) {
                    continue;
                }
                let pad = " ".repeat(indent_of(text));
                let rest = text.trim_start().trim_start_matches('#').trim_start();
                *text = format!("{pad}{rest}");
                changed += 1;
            }
        }
        changed
    }
}
