use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gateway_sdk::AdminClient;
use serde_json::Value;

use bff_gateway::config::loader::load_config;
use bff_gateway::config::schema::{DEFAULT_COOKIE_KEY, DEFAULT_COOKIE_VALUE};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the BFF gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[arg(long, default_value = DEFAULT_COOKIE_KEY)]
    cookie_key: String,

    #[arg(long, default_value = DEFAULT_COOKIE_VALUE)]
    cookie_value: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the active configuration
    Config,
    /// Show the most recent request log records
    Logs {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Validate a local YAML/TOML config file and make it active
    Apply { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let client = AdminClient::new(&cli.url, &cli.cookie_key, &cli.cookie_value);

    match cli.command {
        Commands::Config => print_json(&client.get_config().await?)?,
        Commands::Logs { limit } => {
            for record in client.logs(limit).await? {
                print_record(&record);
            }
        }
        Commands::Apply { file } => {
            let config = load_config(&file)?;
            print_json(&client.update_config(&config).await?)?;
        }
    }

    Ok(())
}

fn print_json(value: &Value) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_record(record: &Value) {
    let field = |name: &str| record.get(name).and_then(Value::as_str).unwrap_or("-");
    let status = record.get("status_code").and_then(Value::as_u64).unwrap_or(0);
    let millis = record.get("duration").and_then(Value::as_u64).unwrap_or(0) / 1_000_000;

    println!(
        "{} {:>3} {:<6} {} rule={} {}ms{}",
        field("start_time"),
        status,
        field("method"),
        field("path"),
        field("rule_name"),
        millis,
        record
            .get("error")
            .and_then(Value::as_str)
            .map(|e| format!(" error={}", e))
            .unwrap_or_default(),
    );
}
