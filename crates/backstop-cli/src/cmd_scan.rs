use std::path::Path;

use backstop_core::PlaceholderMatch;
use backstop_review::{scan_placeholders, tag_histogram};
use backstop_store::BackstopPaths;

const MAX_SAMPLES: usize = 20;

/// `backstop scan <path>`: exit 0 clean, 2 when patterns are found,
/// 1 when the file cannot be read.
pub fn execute(project_root: &Path, path: &str) -> anyhow::Result<()> {
    let abs = BackstopPaths::discover(project_root).absolute(path);
    let content = match backstop_store::read_lossy(&abs) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Cannot read {}: {e}", abs.display());
            std::process::exit(1);
        }
    };
    let matches = scan_placeholders(&content);
    print!("{}", render(&matches));
    if !matches.is_empty() {
        std::process::exit(2);
    }
    Ok(())
}

fn render(matches: &[PlaceholderMatch]) -> String {
    if matches.is_empty() {
        return "No placeholder/demo/simulated/mock patterns detected.\n".to_string();
    }
    let mut out = String::from("PLACEHOLDER/DEMO/SIMULATED DETECTION:\n");
    for (tag, count) in tag_histogram(matches) {
        out.push_str(&format!("  {tag}: {count}\n"));
    }
    out.push('\n');
    for m in matches.iter().take(MAX_SAMPLES) {
        out.push_str(&format!("  L{}: [{}] {}\n", m.line, m.tag, m.text));
    }
    if matches.len() > MAX_SAMPLES {
        out.push_str(&format!("  ... and {} more\n", matches.len() - MAX_SAMPLES));
    }
    out
}
