//! First-time install: fetch the compose and example environment files,
//! then fill in the documented keys of `.env`.

use crate::layout::{write_atomic, InstallLayout, COMPOSE_FILE, EXAMPLE_ENV};
use crate::prompt::Prompter;
use crate::report::Reporter;
use crate::CoreError;
use darkroom_remote::ResourceSource;
use darkroom_schema::{
    AccelerationCategory, DocumentError, EnvKey, EnvironmentStore, ManifestDocument,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Values the example file ships with that must never survive an install.
const PLACEHOLDER_PASSWORD: &str = "postgres";

/// Answers supplied up front. `None` means "ask, defaulting to the current value".
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    pub force: bool,
    pub upload_location: Option<String>,
    pub db_data_location: Option<String>,
    pub timezone: Option<String>,
    pub version: Option<String>,
    pub db_password: Option<String>,
    /// Default offered for `TZ` when neither `.env` nor `timezone` sets it.
    pub detected_timezone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub directory: PathBuf,
    pub overwrote_compose: bool,
    pub kept_env: bool,
    pub generated_password: bool,
    pub env: Vec<(String, String)>,
}

/// Random alphanumeric database password.
pub fn generate_password() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

pub fn install(
    layout: &InstallLayout,
    source: &dyn ResourceSource,
    prompter: &dyn Prompter,
    reporter: &dyn Reporter,
    options: &InstallOptions,
) -> Result<InstallReport, CoreError> {
    layout.initialize()?;
    let compose_path = layout.compose_file();
    let overwrote_compose = compose_path.exists();
    if overwrote_compose && !options.force {
        reporter.advisory(&format!("{} already exists", compose_path.display()));
        if !prompter.confirm("Overwrite it with the release version?", false)? {
            return Err(CoreError::Refused(compose_path.display().to_string()));
        }
    }

    let compose = fetch(source, COMPOSE_FILE)?;
    let example = fetch(source, EXAMPLE_ENV)?;
    let doc = ManifestDocument::parse(&compose)?;
    for category in AccelerationCategory::ALL {
        if doc.service(category.service_name()).is_none() {
            return Err(DocumentError::ServiceNotFound(category.service_name().to_owned()).into());
        }
    }

    let env_path = layout.env_file();
    let kept_env = env_path.exists();
    let mut env = if kept_env {
        reporter.info("keeping values from the existing .env");
        EnvironmentStore::load(&env_path)?
    } else {
        EnvironmentStore::parse(&example)?
    };

    let ask = |key: EnvKey, given: &Option<String>, label: &str, fallback: &str| {
        match given {
            Some(v) => Ok(v.clone()),
            None => {
                let current = env.get(key.as_str()).unwrap_or(fallback).to_owned();
                prompter.input(label, Some(&current))
            }
        }
    };
    let upload = ask(
        EnvKey::UploadLocation,
        &options.upload_location,
        "Where should uploaded photos be stored?",
        "./library",
    )?;
    let db_data = ask(
        EnvKey::DbDataLocation,
        &options.db_data_location,
        "Where should the database files live? (local disk, not a network share)",
        "./postgres",
    )?;
    let timezone = ask(
        EnvKey::Timezone,
        &options.timezone,
        "Time zone",
        options.detected_timezone.as_deref().unwrap_or("Etc/UTC"),
    )?;
    let version = ask(EnvKey::Version, &options.version, "Release to run", "release")?;

    let existing_password = env
        .get(EnvKey::DbPassword.as_str())
        .filter(|p| !p.is_empty() && *p != PLACEHOLDER_PASSWORD)
        .map(str::to_owned);
    let generated_password = options.db_password.is_none() && existing_password.is_none();
    let password = options
        .db_password
        .clone()
        .or(existing_password)
        .unwrap_or_else(generate_password);

    env.set(EnvKey::UploadLocation, &upload);
    env.set(EnvKey::DbDataLocation, &db_data);
    env.set(EnvKey::Timezone, &timezone);
    env.set(EnvKey::Version, &version);
    env.set(EnvKey::DbPassword, &password);

    write_atomic(&compose_path, &compose)?;
    write_atomic(&env_path, &env.to_string())?;
    restrict_permissions(&env_path)?;
    reporter.success(&format!("wrote {} and .env", compose_path.display()));
    if generated_password {
        reporter.info("generated a random database password in .env");
    }

    let env_summary = EnvKey::ALL
        .iter()
        .filter(|k| **k != EnvKey::DbPassword)
        .filter_map(|k| env.get(k.as_str()).map(|v| (k.as_str().to_owned(), v.to_owned())))
        .collect();
    Ok(InstallReport {
        directory: layout.root().to_path_buf(),
        overwrote_compose,
        kept_env,
        generated_password,
        env: env_summary,
    })
}

fn fetch(source: &dyn ResourceSource, name: &str) -> Result<String, CoreError> {
    source.fetch_text(name).map_err(|error| CoreError::Fetch {
        name: name.to_owned(),
        location: source.describe(),
        error,
    })
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), CoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), CoreError> {
    Ok(())
}
