use super::{json_pretty, Context, EXIT_SUCCESS};
use darkroom_core::{CategoryResult, Engine};
use darkroom_schema::AccelerationCategory;

pub fn run(ctx: &Context, category: AccelerationCategory) -> Result<u8, String> {
    ctx.require_install()?;
    let source = ctx.resource_source();
    let prompter = ctx.prompter();
    let reporter = ctx.reporter();
    let engine = Engine::new(
        ctx.layout.clone(),
        source.as_ref(),
        prompter.as_ref(),
        &reporter,
    );
    let result: CategoryResult = engine.disable(category).map_err(|e| e.to_string())?.into();

    if ctx.json {
        let payload = serde_json::json!({
            "category": category,
            "outcome": result,
            "messages": reporter.messages(),
        });
        println!("{}", json_pretty(&payload)?);
    } else if result == CategoryResult::Disabled {
        println!("{category} acceleration disabled");
    }
    Ok(EXIT_SUCCESS)
}
