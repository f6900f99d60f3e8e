use super::accel::{configure_categories, parse_directive, print_summary};
use super::{json_pretty, spin_fail, spin_ok, spinner, Context, EXIT_FAILURE, EXIT_SUCCESS};
use darkroom_core::{CoreError, Engine, InstallOptions, Reporter};
use darkroom_runtime::{detect_timezone, ComposeLauncher, SystemHost};
use darkroom_schema::AccelerationCategory;

#[derive(Debug, Default)]
pub struct InstallArgs {
    pub force: bool,
    pub upload_location: Option<String>,
    pub db_data_location: Option<String>,
    pub timezone: Option<String>,
    pub release: Option<String>,
    pub db_password: Option<String>,
    pub transcoding: Option<String>,
    pub inference: Option<String>,
    pub no_accel: bool,
    pub start: bool,
}

impl InstallArgs {
    /// Flags first, then the config file.
    fn options(&self, ctx: &Context) -> InstallOptions {
        let section = &ctx.config.install;
        InstallOptions {
            force: self.force,
            upload_location: self
                .upload_location
                .clone()
                .or_else(|| section.upload_location.clone()),
            db_data_location: self
                .db_data_location
                .clone()
                .or_else(|| section.db_data_location.clone()),
            timezone: self.timezone.clone().or_else(|| section.timezone.clone()),
            version: self.release.clone(),
            db_password: self.db_password.clone(),
            detected_timezone: detect_timezone(&SystemHost),
        }
    }
}

#[allow(clippy::too_many_lines)]
pub fn run(ctx: &Context, args: &InstallArgs) -> Result<u8, String> {
    let plan = if args.no_accel {
        Vec::new()
    } else {
        vec![
            (
                AccelerationCategory::Transcoding,
                parse_directive(AccelerationCategory::Transcoding, args.transcoding.as_deref())?,
            ),
            (
                AccelerationCategory::Inference,
                parse_directive(AccelerationCategory::Inference, args.inference.as_deref())?,
            ),
        ]
    };

    let source = ctx.resource_source();
    let prompter = ctx.prompter();
    let reporter = ctx.reporter();
    let engine = Engine::new(
        ctx.layout.clone(),
        source.as_ref(),
        prompter.as_ref(),
        &reporter,
    );

    let report = engine.install(&args.options(ctx)).map_err(|e| {
        if let CoreError::Fetch { name, .. } = &e {
            reporter.error(&format!(
                "download {name} manually into {} and run again",
                ctx.layout.root().display()
            ));
        }
        e.to_string()
    })?;

    let (outcomes, failures) = if plan.is_empty() {
        (Vec::new(), Vec::new())
    } else {
        let evidence = ctx.probe();
        configure_categories(&engine, &reporter, &plan, &evidence)?
    };

    let mut started = false;
    if args.start {
        let launcher =
            ComposeLauncher::detect(&SystemHost, ctx.layout.root()).map_err(|e| e.to_string())?;
        let pb = if ctx.json {
            indicatif::ProgressBar::hidden()
        } else {
            spinner("starting the stack...")
        };
        match launcher.up() {
            Ok(()) => {
                spin_ok(&pb, "stack started");
                started = true;
            }
            Err(e) => {
                spin_fail(&pb, "stack failed to start");
                return Err(format!("failed to start the stack: {e}"));
            }
        }
    }

    if ctx.json {
        let payload = serde_json::json!({
            "install": report,
            "categories": outcomes,
            "failures": failures,
            "started": started,
            "messages": reporter.messages(),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!();
        println!("installed into {}", report.directory.display());
        for (key, value) in &report.env {
            println!("  {key}={value}");
        }
        if !outcomes.is_empty() || !failures.is_empty() {
            println!();
            print_summary(&outcomes);
            for failure in &failures {
                println!("{:<12} failed", failure.category.as_str());
            }
        }
        if !started {
            println!();
            println!(
                "start it with: darkroom up --dir {}",
                ctx.layout.root().display()
            );
        }
    }

    Ok(if failures.is_empty() {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    })
}
