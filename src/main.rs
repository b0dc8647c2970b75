mod cli;
mod commands;
mod formatting;
mod logging;
mod settings;

use std::process::ExitCode;

use commands::run_capture_command;

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();
    logging::init_logging(args.verbose, args.log_format);
    run_capture_command(args).await
}
