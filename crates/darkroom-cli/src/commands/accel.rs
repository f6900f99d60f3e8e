use super::{json_pretty, ConsoleReporter, Context, EXIT_FAILURE, EXIT_SUCCESS};
use darkroom_core::{CategoryOutcome, CategoryResult, CoreError, Directive, Engine, Reporter};
use darkroom_runtime::HostEvidence;
use darkroom_schema::AccelerationCategory;

/// A category that could not be configured but did not stop the run.
#[derive(Debug, serde::Serialize)]
pub struct CategoryFailure {
    pub category: AccelerationCategory,
    pub error: String,
}

pub fn parse_directive(
    category: AccelerationCategory,
    input: Option<&str>,
) -> Result<Directive, String> {
    match input {
        None => Ok(Directive::Auto),
        Some(value) => Directive::parse(category, value)
            .map_err(|e| format!("invalid --{category} value '{value}': {e}")),
    }
}

/// Configure each category in order. Fetch and fragment problems only end
/// their own category; document and prompt errors end the run.
pub fn configure_categories(
    engine: &Engine<'_>,
    reporter: &ConsoleReporter,
    plan: &[(AccelerationCategory, Directive)],
    evidence: &HostEvidence,
) -> Result<(Vec<CategoryOutcome>, Vec<CategoryFailure>), String> {
    let mut outcomes = Vec::new();
    let mut failures = Vec::new();
    for &(category, directive) in plan {
        match engine.configure(category, directive, evidence) {
            Ok(outcome) => outcomes.push(outcome),
            Err(e @ (CoreError::Fetch { .. } | CoreError::FragmentMissingProfile { .. })) => {
                reporter.error(&format!("{category}: {e}"));
                failures.push(CategoryFailure {
                    category,
                    error: e.to_string(),
                });
            }
            Err(e) => return Err(e.to_string()),
        }
    }
    Ok((outcomes, failures))
}

pub fn print_summary(outcomes: &[CategoryOutcome]) {
    for outcome in outcomes {
        let line = match &outcome.result {
            CategoryResult::Applied { profile, .. } => format!("{profile} enabled"),
            CategoryResult::ApplyDeclined { existing } => format!("kept {existing}"),
            CategoryResult::Disabled => "disabled".to_owned(),
            CategoryResult::NothingToDisable => "not configured".to_owned(),
            CategoryResult::DisableDeclined => "kept current configuration".to_owned(),
            CategoryResult::Skipped => "unchanged".to_owned(),
        };
        println!("{:<12} {line}", outcome.category.as_str());
    }
}

pub fn run(
    ctx: &Context,
    categories: &[AccelerationCategory],
    transcoding: Option<&str>,
    inference: Option<&str>,
) -> Result<u8, String> {
    ctx.require_install()?;
    let plan = categories
        .iter()
        .map(|&category| {
            let flag = match category {
                AccelerationCategory::Transcoding => transcoding,
                AccelerationCategory::Inference => inference,
            };
            parse_directive(category, flag).map(|d| (category, d))
        })
        .collect::<Result<Vec<_>, String>>()?;

    let evidence = ctx.probe();
    let source = ctx.resource_source();
    let prompter = ctx.prompter();
    let reporter = ctx.reporter();
    let engine = Engine::new(
        ctx.layout.clone(),
        source.as_ref(),
        prompter.as_ref(),
        &reporter,
    );

    let (outcomes, failures) = configure_categories(&engine, &reporter, &plan, &evidence)?;

    if ctx.json {
        let payload = serde_json::json!({
            "directory": ctx.layout.root(),
            "wsl": evidence.wsl,
            "categories": outcomes,
            "failures": failures,
            "messages": reporter.messages(),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!();
        print_summary(&outcomes);
        for failure in &failures {
            println!("{:<12} failed", failure.category.as_str());
        }
    }
    Ok(if failures.is_empty() {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use darkroom_schema::Profile;

    #[test]
    fn directive_defaults_to_auto() {
        assert_eq!(
            parse_directive(AccelerationCategory::Inference, None).unwrap(),
            Directive::Auto
        );
        assert_eq!(
            parse_directive(AccelerationCategory::Inference, Some("rknn")).unwrap(),
            Directive::Profile(Profile::Rknn)
        );
    }

    #[test]
    fn directive_from_other_category_is_rejected() {
        let err = parse_directive(AccelerationCategory::Transcoding, Some("cuda")).unwrap_err();
        assert!(err.starts_with("invalid --transcoding value 'cuda'"));
    }
}
