use std::io::{Read, Write};

/// `backstop hook [--event NAME]`: read stdin, dispatch, print the response.
/// Exit 2 only when the action is denied; every other outcome exits 0.
pub fn execute(event: Option<&str>) -> anyhow::Result<()> {
    let mut stdin_buf = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut stdin_buf) {
        tracing::warn!(error = %e, "stdin read failed");
    }
    tracing::debug!(bytes = stdin_buf.len(), event = event.unwrap_or(""), "hook request");

    let result = backstop_bridge::hook_entrypoint_from_stdin(&stdin_buf, event);
    let output = result.to_json();
    let mut stdout = std::io::stdout();
    if let Err(e) = stdout.write_all(output.as_bytes()).and_then(|_| stdout.flush()) {
        tracing::warn!(error = %e, "stdout write failed");
    }
    if result.blocked {
        std::process::exit(2);
    }
    Ok(())
}
