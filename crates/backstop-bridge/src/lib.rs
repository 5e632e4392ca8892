pub mod decision;
pub mod redact;
pub mod shell;

mod admin;
mod dispatch;
mod parse;

pub use admin::{hooks_path, install, uninstall, HOOK_EVENTS};
pub use dispatch::{
    fallback_response, hook_entrypoint_from_stdin, Bridge, HookResponse, HookResult,
};
pub use parse::HookRequest;
