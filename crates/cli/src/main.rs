use std::process::ExitCode;

fn main() -> ExitCode {
    barometer_cli::run()
}
