use std::process::ExitCode;

fn main() -> anyhow::Result<ExitCode> {
    goodtable_cli::run()
}
