use std::path::Path;

use backstop_store::{BackstopPaths, SessionStore};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum StateCmd {
    /// Print the stored session record
    Show {
        /// Conversation id (empty selects the shared default record)
        #[arg(long, default_value = "")]
        conversation: String,
    },
}

pub fn run(cmd: StateCmd, project_root: &Path) -> anyhow::Result<()> {
    match cmd {
        StateCmd::Show { conversation } => {
            let store = SessionStore::new(&BackstopPaths::discover(project_root));
            let state = store.get(&conversation);
            if state.is_empty() {
                println!("(no state recorded)");
            } else {
                println!("{}", serde_json::to_string_pretty(&state.into_value())?);
            }
            Ok(())
        }
    }
}
