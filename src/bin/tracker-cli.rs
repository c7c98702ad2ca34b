use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "tracker-cli")]
#[command(about = "Admin CLI for the call-tracker service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Admin API key, sent as a bearer token on admin commands
    #[arg(short, long, default_value = "")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service status
    Status,
    /// Summarize live transaction buckets
    Transactions,
    /// Drop every transaction bucket
    Clear,
    /// Make a tracked outbound GET through the service
    Fetch {
        /// Target URL
        target: String,
        /// Transaction id to record the call under
        #[arg(short, long)]
        transaction: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut admin_headers = HeaderMap::new();
    admin_headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    match cli.command {
        Commands::Status => {
            let res = client.get(format!("{}/health", base)).send().await?;
            print_response(res).await?;
        }
        Commands::Transactions => {
            let res = client
                .get(format!("{}/admin/transactions", base))
                .headers(admin_headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Clear => {
            let res = client
                .delete(format!("{}/admin/transactions", base))
                .headers(admin_headers)
                .send()
                .await?;
            if res.status().is_success() {
                println!("Cleared all transaction buckets");
            } else {
                eprintln!("Error: admin API returned status {}", res.status());
            }
        }
        Commands::Fetch { target, transaction } => {
            let mut req = client.get(format!("{}/fetch", base)).query(&[("url", target.as_str())]);
            if let Some(id) = transaction {
                req = req.header("x-transaction-id", id);
            }
            let res = req.send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
