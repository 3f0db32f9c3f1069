use std::path::Path;
use crate::cli::commands::ValidateArgs;
use crate::config;
use crate::errors::CyberHuntError;

pub async fn handle_validate(args: ValidateArgs) -> Result<(), CyberHuntError> {
    let config = config::parse_config(Path::new(&args.config)).await?;
    println!("Configuration is valid: {}", args.config);
    println!(
        "  server {}:{} (auth {}), database {}",
        config.server.host,
        config.server.port,
        if config.server.api_token.is_some() { "on" } else { "off" },
        config.database.path
    );
    Ok(())
}
