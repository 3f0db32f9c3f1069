use clap::{Parser, Subcommand, Args};

#[derive(Parser)]
#[command(name = "cyberhunt", version, about = "Review and triage workflow service for bug-bounty submissions")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server
    Serve(ServeArgs),
    /// Show a review from a running server
    Query(QueryArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[derive(Args, Clone)]
pub struct ServeArgs {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Listen address (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Listen port (overrides config)
    #[arg(long)]
    pub port: Option<u16>,

    /// SQLite database path (overrides config)
    #[arg(long)]
    pub db: Option<String>,
}

#[derive(Args, Clone)]
pub struct QueryArgs {
    /// Review ID to show
    pub review_id: String,

    /// Base URL of the running server
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    pub server: String,

    /// API token (defaults to $CYBERHUNT_API_TOKEN)
    #[arg(long)]
    pub token: Option<String>,

    /// Also list the review's comments
    #[arg(long)]
    pub comments: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// Config file to validate
    pub config: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::try_parse_from(["cyberhunt", "-vv", "serve", "--port", "9000", "--db", "/tmp/x.db"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.port, Some(9000));
                assert_eq!(args.db.as_deref(), Some("/tmp/x.db"));
                assert!(args.host.is_none());
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_parse_query_defaults() {
        let cli = Cli::try_parse_from(["cyberhunt", "query", "r-1", "--json"]).unwrap();
        match cli.command {
            Commands::Query(args) => {
                assert_eq!(args.review_id, "r-1");
                assert_eq!(args.server, "http://127.0.0.1:8080");
                assert!(args.json);
            }
            _ => panic!("expected query"),
        }
    }
}
