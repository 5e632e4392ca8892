use std::path::Path;

use anyhow::Context;
use backstop_core::GuardConfig;
use backstop_store::BackstopPaths;

/// `backstop review --before A --after B [--path P]`
pub fn execute(
    project_root: &Path,
    before: &str,
    after: &str,
    path: Option<&str>,
) -> anyhow::Result<()> {
    let paths = BackstopPaths::discover(project_root);
    let config = GuardConfig::load(&paths.config_json);
    let before_abs = paths.absolute(before);
    let after_abs = paths.absolute(after);
    let before_text = backstop_store::read_lossy(&before_abs)
        .with_context(|| format!("reading {}", before_abs.display()))?;
    let after_text = backstop_store::read_lossy(&after_abs)
        .with_context(|| format!("reading {}", after_abs.display()))?;

    let result = backstop_review::review(&before_text, &after_text, path.unwrap_or(after), &config);
    println!("{}", serde_json::to_string_pretty(&result)?);
    if result.degraded {
        std::process::exit(2);
    }
    Ok(())
}
