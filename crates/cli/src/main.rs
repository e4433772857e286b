use std::process::ExitCode;

fn main() -> ExitCode {
    sasha_cli::run()
}
