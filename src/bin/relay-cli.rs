use clap::Parser;
use indexmap::IndexMap;
use serde_json::Value;
use url::Url;

use http_relay::RequestDescription;

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Send a request through a running http-relay", long_about = None)]
struct Cli {
    /// Base URL of the relay.
    #[arg(short, long, default_value = "http://127.0.0.1:8000")]
    relay: String,

    /// HTTP method to relay (any case).
    method: String,

    /// Target URL.
    url: String,

    /// Header as `name:value`; repeatable.
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Query parameter as `name=value`; repeatable.
    #[arg(short = 'q', long = "param", value_parser = parse_param)]
    params: Vec<(String, String)>,

    /// JSON body (sent only for POST, PUT and PATCH).
    #[arg(short = 'd', long = "data", value_parser = parse_json)]
    data: Option<Value>,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected name:value, got '{raw}'"))?;
    Ok((name.trim().to_string(), value.trim().to_string()))
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))?;
    Ok((name.to_string(), value.to_string()))
}

fn parse_json(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("invalid JSON body: {e}"))
}

fn to_map(pairs: Vec<(String, String)>) -> Option<IndexMap<String, String>> {
    (!pairs.is_empty()).then(|| pairs.into_iter().collect())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let endpoint = Url::parse(&cli.relay)?.join("proxy")?;

    let description = RequestDescription {
        method: cli.method,
        url: cli.url,
        headers: to_map(cli.headers),
        params: to_map(cli.params),
        body: cli.data,
    };

    let client = reqwest::Client::new();
    let res = client.post(endpoint).json(&description).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: relay returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
