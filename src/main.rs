//! th - TranslateHub command-line entry point

use std::process::ExitCode;

use translatehub::ui::output;

fn main() -> ExitCode {
    match translatehub::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::error(format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}
