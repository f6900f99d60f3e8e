use crate::host::HostInspector;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// In-memory host for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct MockHost {
    commands: HashSet<String>,
    outputs: HashMap<String, String>,
    files: HashMap<PathBuf, String>,
    paths: HashSet<PathBuf>,
    dirs: HashMap<PathBuf, Vec<String>>,
    env: HashMap<String, String>,
}

fn command_key(program: &str, args: &[&str]) -> String {
    let mut key = program.to_owned();
    for arg in args {
        key.push(' ');
        key.push_str(arg);
    }
    key
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_command(mut self, name: &str) -> Self {
        self.commands.insert(name.to_owned());
        self
    }

    /// Register a successful invocation. The program also counts as installed.
    #[must_use]
    pub fn with_output(mut self, program: &str, args: &[&str], stdout: &str) -> Self {
        self.commands.insert(program.to_owned());
        self.outputs
            .insert(command_key(program, args), stdout.to_owned());
        self
    }

    #[must_use]
    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(PathBuf::from(path), content.to_owned());
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: &str) -> Self {
        self.paths.insert(PathBuf::from(path));
        self
    }

    #[must_use]
    pub fn with_dir_entry(mut self, dir: &str, entry: &str) -> Self {
        self.dirs
            .entry(PathBuf::from(dir))
            .or_default()
            .push(entry.to_owned());
        self
    }

    #[must_use]
    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl HostInspector for MockHost {
    fn command_exists(&self, name: &str) -> bool {
        self.commands.contains(name)
    }

    fn command_output(&self, program: &str, args: &[&str]) -> Option<String> {
        self.outputs.get(&command_key(program, args)).cloned()
    }

    fn path_exists(&self, path: &Path) -> bool {
        self.paths.contains(path)
            || self.files.contains_key(path)
            || self.dirs.contains_key(path)
            || path
                .parent()
                .zip(path.file_name())
                .and_then(|(dir, name)| {
                    self.dirs
                        .get(dir)
                        .map(|entries| entries.iter().any(|e| *e == *name.to_string_lossy()))
                })
                .unwrap_or(false)
    }

    fn read_file(&self, path: &Path) -> Option<String> {
        self.files.get(path).cloned()
    }

    fn list_dir(&self, path: &Path) -> Vec<String> {
        let mut entries = self.dirs.get(path).cloned().unwrap_or_default();
        entries.sort();
        entries
    }

    fn env_var(&self, key: &str) -> Option<String> {
        self.env.get(key).cloned()
    }
}
