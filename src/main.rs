use clap::Parser;
use tracing::{error, info};

use cosmos_worker::{
    cli::{init_config, run_fetch, Cli, Commands},
    configuration::{AppState, Config, State},
    error::Error,
    server,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let result = app_main().await;

    if let Err(err) = &result {
        error!("{}", err);
    }

    result
}

async fn app_main() -> Result<(), Error> {
    let cli = Cli::parse();

    let config = match init_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return Err(Error::ConfigurationError(e.to_string()));
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_level(true)
        .with_max_level(config.log_level)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Some(Commands::Fetch { start, end }) => run_fetch(config, start, end).await,
        Some(Commands::Serve) | None => serve(config).await,
    }
}

async fn serve(config: Config) -> Result<(), Error> {
    let state = State::new(config).await?;
    let app_state = AppState::new(state);

    tokio::select! {
        result = server::server_task(&app_state) => result,
        result = tokio::signal::ctrl_c() => {
            info!("shutting down");
            Ok(result?)
        },
    }
}
