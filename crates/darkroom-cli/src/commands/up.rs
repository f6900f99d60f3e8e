use super::{json_pretty, Context, EXIT_SUCCESS};
use darkroom_runtime::{ComposeLauncher, SystemHost};

/// Default port the web interface listens on.
const WEB_PORT: u16 = 2283;

pub fn run(ctx: &Context) -> Result<u8, String> {
    ctx.require_install()?;
    let root = ctx.layout.root();
    let launcher = ComposeLauncher::detect(&SystemHost, root).map_err(|e| e.to_string())?;
    if !ctx.json {
        println!("running '{}' in {}", launcher.up_args().join(" "), root.display());
    }
    launcher.up().map_err(|e| format!("failed to start the stack: {e}"))?;

    let url = format!("http://localhost:{WEB_PORT}");
    if ctx.json {
        let payload = serde_json::json!({
            "status": "started",
            "directory": root,
            "url": url,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("stack started; open {url} to finish setup");
    }
    Ok(EXIT_SUCCESS)
}
