use std::process::ExitCode;

fn main() -> ExitCode {
    vittalogic_cli::run()
}
