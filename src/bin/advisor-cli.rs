use std::collections::BTreeMap;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "advisor-cli")]
#[command(about = "Command-line client for the pest advisor service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question
    Query {
        /// pest_identification, control_methods, crop_pests, indigenous_practice or general
        query_type: String,
        /// Extra parameters as key=value (e.g. pest_name=aphid)
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
        /// Free-text question
        #[arg(short, long)]
        text: Option<String>,
    },
    /// Show initialization, backend, breaker and model status
    Status,
    /// Re-provision a failed specialized model
    RetryModel { query_type: String },
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    let (key, value) = s.split_once('=').ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    Ok((key.trim().to_string(), value.trim().to_string()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Query { query_type, params, text } => {
            let mut params: BTreeMap<String, String> = params.into_iter().collect();
            if let Some(text) = text {
                params.insert("query".to_string(), text);
            }
            let res = client
                .post(format!("{}/api/query", base))
                .json(&json!({ "query_type": query_type, "params": params }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Status => {
            let res = client.get(format!("{}/api/status", base)).send().await?;
            print_response(res).await?;
        }
        Commands::RetryModel { query_type } => {
            let res = client.post(format!("{}/api/models/{}/retry", base, query_type)).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: advisor returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("{}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
