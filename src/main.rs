use clap::Parser;
use firefly_importer::args::{Args, Command};
use firefly_importer::{commands, Config, Mode, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().home().path();

    // This allows for testing the program without hitting Firefly or the vision API. When
    // FIREFLY_IMPORTER_IN_TEST_MODE is set and non-zero in length, then the mode will be
    // Mode::Test, otherwise it will be Mode::Firefly.
    let mode = Mode::from_env();

    let _: () = match args.command() {
        Command::Init(init_args) => commands::init(home, init_args.settings()).await?.print(),

        Command::Accounts => {
            let config = Config::load(home, args.common().credentials()).await?;
            commands::accounts(&config, mode).await?.print()
        }

        Command::Labels => {
            let config = Config::load(home, args.common().credentials()).await?;
            commands::labels(&config, mode).await?.print()
        }

        Command::Import(import_args) => {
            let config = Config::load(home, args.common().credentials()).await?;
            commands::import(
                &config,
                mode,
                import_args.account_id(),
                import_args.file(),
                import_args.output(),
            )
            .await?
            .print()
        }

        Command::Submit(submit_args) => {
            let config = Config::load(home, args.common().credentials()).await?;
            commands::submit(&config, mode, submit_args.file())
                .await?
                .print()
        }

        Command::Mappings => {
            let config = Config::load(home, args.common().credentials()).await?;
            commands::mappings(&config).await?.print()
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME").replace('-', "_"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
