//! Binary entrypoint of the conversation store inspector.

use std::process::ExitCode;

use chat_store::inspect;

/// Open the configured store and log its contents.
fn main() -> ExitCode {
    inspect::run()
}
