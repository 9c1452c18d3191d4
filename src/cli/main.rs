use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "anomaly-cli")]
#[command(about = "Traffic anomaly detector CLI", long_about = None)]
struct Cli {
    #[arg(short, long, env = "ANOMALY_DETECTOR_ENDPOINT", default_value = "http://localhost:8000")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health
    Health,

    /// Show per-model metrics
    Info,

    /// List the expected feature names
    Features,

    /// Classify a single traffic sample
    Predict {
        /// JSON file holding a feature map
        #[arg(short, long, conflicts_with = "features", required_unless_present = "features")]
        file: Option<PathBuf>,

        /// Inline features as NAME=VALUE, repeatable
        #[arg(short = 'F', long = "feature", value_name = "NAME=VALUE")]
        features: Vec<String>,

        /// Model identifier (knn, logistic_regression)
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Classify every sample in a JSON array file
    Batch {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long)]
        model: Option<String>,
    },

    /// Show bundle metadata and prediction summary
    Stats,

    /// Show recent predictions
    History {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let endpoint = cli.endpoint.trim_end_matches('/');

    let body = match cli.command {
        Commands::Health => get(&client, &format!("{}/health", endpoint)).await?,

        Commands::Info => get(&client, &format!("{}/api/models/info", endpoint)).await?,

        Commands::Features => get(&client, &format!("{}/api/models/features", endpoint)).await?,

        Commands::Predict {
            file,
            features,
            model,
        } => {
            let features = match file {
                Some(path) => read_feature_map(&path)?,
                None => parse_inline_features(&features)?,
            };

            let mut request = json!({ "features": features });
            if let Some(model) = model {
                request["model_type"] = Value::String(model);
            }
            post(&client, &format!("{}/api/predict", endpoint), &request).await?
        }

        Commands::Batch { file, model } => {
            let data = read_json(&file)?;
            let data = match data {
                Value::Array(items) => Value::Array(items),
                Value::Object(mut obj) => obj
                    .remove("data")
                    .ok_or_else(|| anyhow!("{} has no \"data\" array", file.display()))?,
                _ => bail!("{} must contain a JSON array", file.display()),
            };

            let mut request = json!({ "data": data });
            if let Some(model) = model {
                request["model_type"] = Value::String(model);
            }
            post(&client, &format!("{}/api/predict/batch", endpoint), &request).await?
        }

        Commands::Stats => get(&client, &format!("{}/api/stats", endpoint)).await?,

        Commands::History { limit } => {
            get(&client, &format!("{}/api/history?limit={}", endpoint, limit)).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

async fn get(client: &Client, url: &str) -> anyhow::Result<Value> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("request to {} failed", url))?;
    Ok(response.json().await?)
}

async fn post(client: &Client, url: &str, body: &Value) -> anyhow::Result<Value> {
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .with_context(|| format!("request to {} failed", url))?;
    Ok(response.json().await?)
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// Accepts either a bare feature map or `{"features": {...}}`
fn read_feature_map(path: &Path) -> anyhow::Result<Map<String, Value>> {
    match read_json(path)? {
        Value::Object(mut obj) => match obj.remove("features") {
            Some(Value::Object(features)) => Ok(features),
            Some(_) => bail!("\"features\" in {} must be an object", path.display()),
            None => Ok(obj),
        },
        _ => bail!("{} must contain a JSON object", path.display()),
    }
}

fn parse_inline_features(pairs: &[String]) -> anyhow::Result<Map<String, Value>> {
    pairs
        .iter()
        .map(|pair| {
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("expected NAME=VALUE, got '{}'", pair))?;
            let value: f64 = value
                .trim()
                .parse()
                .with_context(|| format!("feature '{}' is not a number", name))?;
            Ok((name.trim().to_string(), json!(value)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inline_features() {
        let map = parse_inline_features(&["duration=10".to_string(), "packets = 80.5".to_string()])
            .unwrap();
        assert_eq!(map["duration"], json!(10.0));
        assert_eq!(map["packets"], json!(80.5));
    }

    #[test]
    fn test_parse_inline_features_rejects_garbage() {
        assert!(parse_inline_features(&["duration".to_string()]).is_err());
        assert!(parse_inline_features(&["duration=fast".to_string()]).is_err());
    }

    #[test]
    fn test_read_feature_map_accepts_wrapped_form() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");
        std::fs::write(&path, r#"{"features": {"duration": 1}, "model_type": "knn"}"#).unwrap();

        let map = read_feature_map(&path).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["duration"], json!(1));
    }
}
