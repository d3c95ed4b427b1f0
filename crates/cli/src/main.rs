use std::process::ExitCode;

fn main() -> ExitCode {
    courtier_cli::run()
}
