use std::process::ExitCode;

use repofile::cli::{self, Cli};
use repofile::telemetry;
use repofile::ui::output;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();
    telemetry::init(cli.debug);

    match cli::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::error(format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}
