use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the service gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:9092")]
    url: String,

    #[arg(short, long, env = "GATEWAY_ADMIN_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Overall gateway status
    Status,
    /// Circuit breaker snapshots, or one breaker by service name
    Breakers { service: Option<String> },
    /// Follow the live breaker event stream
    Watch,
    /// Instances discovery currently reports for a service
    Instances { service: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let path = match &cli.command {
        Commands::Status => "/admin/status".to_string(),
        Commands::Breakers { service: None } => "/admin/breakers".to_string(),
        Commands::Breakers { service: Some(name) } => format!("/admin/breakers/{}", name),
        Commands::Watch => "/admin/breakers/stream".to_string(),
        Commands::Instances { service } => format!("/admin/services/{}", service),
    };

    let res = client
        .get(format!("{}{}", cli.url, path))
        .headers(headers)
        .send()
        .await?;

    match cli.command {
        Commands::Watch => follow(res).await,
        _ => print_response(res).await,
    }
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

/// Print one line per breaker for every `data:` frame of the stream.
async fn follow(mut res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    if !res.status().is_success() {
        eprintln!("Error: Admin API returned status {}", res.status());
        return Ok(());
    }

    let mut buffer = String::new();
    while let Some(chunk) = res.chunk().await? {
        buffer.push_str(&String::from_utf8_lossy(&chunk));
        while let Some(end) = buffer.find("\n\n") {
            let frame: String = buffer.drain(..end + 2).collect();
            for data in frame.lines().filter_map(|l| l.strip_prefix("data:")) {
                let Ok(Value::Array(breakers)) = serde_json::from_str::<Value>(data.trim()) else {
                    continue;
                };
                for b in breakers {
                    println!(
                        "{:<24} {:<10} in_flight={:<4} window={}/{} ({}%)",
                        b["name"].as_str().unwrap_or("?"),
                        b["state"].as_str().unwrap_or("?"),
                        b["in_flight"],
                        b["window_failures"],
                        b["window_requests"],
                        b["error_percent"],
                    );
                }
                println!();
            }
        }
    }
    Ok(())
}
