use clap::Parser;
use cyberhunt::cli::{self, Commands};
use cyberhunt::config::LoggingConfig;
use cyberhunt::errors::CyberHuntError;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();
    if cli.no_color {
        console::set_colors_enabled(false);
    }

    let result = match cli.command {
        Commands::Serve(args) => match cli::serve::resolve_config(&args).await {
            Ok(config) => {
                init_tracing(cli.verbose, cli.json_logs, cli.no_color, Some(&config.logging));
                cli::serve::handle_serve(config).await
            }
            Err(e) => {
                init_tracing(cli.verbose, cli.json_logs, cli.no_color, None);
                Err(e)
            }
        },
        Commands::Query(args) => {
            init_tracing(cli.verbose, cli.json_logs, cli.no_color, None);
            cli::query::handle_query(args).await
        }
        Commands::Validate(args) => {
            init_tracing(cli.verbose, cli.json_logs, cli.no_color, None);
            cli::validate::handle_validate(args).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let exit_code = match &e {
            CyberHuntError::Config(_) => 2,
            CyberHuntError::Database(_) => 3,
            _ => 1,
        };
        std::process::exit(exit_code);
    }
}

/// `-v` flags win over the config file level; `RUST_LOG` wins over both.
fn init_tracing(verbose: u8, json_flag: bool, no_color: bool, logging: Option<&LoggingConfig>) {
    let log_level = match verbose {
        0 => logging.map(|l| l.level.to_lowercase()).unwrap_or_else(|| "info".to_string()),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    let json = json_flag || logging.map_or(false, |l| l.json);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_ansi(!no_color)
            .init();
    }
}
