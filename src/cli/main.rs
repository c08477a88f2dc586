use clap::{Args, Parser, Subcommand};
use outbreak_prediction_api::artifacts::{
    deployment_dir, ArtifactFormat, ArtifactLoader, ArtifactPaths,
};
use outbreak_prediction_api::config::Config;
use outbreak_prediction_api::inference::{InferencePipeline, PredictionRequest};
use reqwest::Client;
use serde_json::json;
use std::error::Error;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "outbreak-cli")]
#[command(about = "Outbreak Prediction API CLI", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000", env = "OUTBREAK_API_ENDPOINT")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the artifacts locally and print the readiness report
    Check {
        #[command(flatten)]
        artifacts: ArtifactArgs,
    },

    /// Score a feature vector locally without a running server
    Predict {
        #[command(flatten)]
        artifacts: ArtifactArgs,

        /// Comma-separated feature values
        #[arg(short, long, value_delimiter = ',', allow_negative_numbers = true, required = true)]
        features: Vec<f64>,
    },

    /// Check server health
    Health,

    /// Score a feature vector on a running server
    RemotePredict {
        /// Comma-separated feature values
        #[arg(short, long, value_delimiter = ',', allow_negative_numbers = true, required = true)]
        features: Vec<f64>,
    },
}

#[derive(Args)]
struct ArtifactArgs {
    /// Artifact directory (relative to the working directory)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Model artifact file name
    #[arg(long)]
    model_file: Option<String>,

    /// Scaler artifact file name
    #[arg(long)]
    scaler_file: Option<String>,

    /// Artifact encoding: auto, json or bincode
    #[arg(long, value_parser = parse_format)]
    format: Option<ArtifactFormat>,
}

impl ArtifactArgs {
    fn loader(self) -> Result<ArtifactLoader, Box<dyn Error>> {
        let mut config = Config::load().unwrap_or_default().artifacts;
        let base = if self.dir.is_some() {
            std::env::current_dir()?
        } else {
            deployment_dir()
        };

        if let Some(dir) = self.dir {
            config.dir = Some(dir);
        }
        if let Some(model_file) = self.model_file {
            config.model_file = model_file;
        }
        if let Some(scaler_file) = self.scaler_file {
            config.scaler_file = scaler_file;
        }
        if let Some(format) = self.format {
            config.format = format;
        }

        Ok(ArtifactLoader::new(ArtifactPaths::resolve(&config, &base), config.format))
    }
}

fn parse_format(value: &str) -> Result<ArtifactFormat, String> {
    match value {
        "auto" => Ok(ArtifactFormat::Auto),
        "json" => Ok(ArtifactFormat::Json),
        "bincode" => Ok(ArtifactFormat::Bincode),
        other => Err(format!("unknown artifact format '{}'", other)),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let client = Client::new();

    match cli.command {
        Commands::Check { artifacts } => {
            let state = artifacts.loader()?.load();

            let body = json!({
                "state": state.lifecycle(),
                "model_loaded": state.model_loaded(),
                "scaler_loaded": state.scaler_loaded(),
                "failure": state.failure(),
                "artifacts": state.reports(),
            });
            println!("{}", serde_json::to_string_pretty(&body)?);

            if !state.is_ready() {
                std::process::exit(1);
            }
        }

        Commands::Predict {
            artifacts,
            features,
        } => {
            let state = artifacts.loader()?.load();
            let Some(loaded) = state.artifacts() else {
                eprintln!("Model service not ready");
                std::process::exit(1);
            };

            match InferencePipeline::run_blocking(loaded, PredictionRequest::new(features)).await {
                Ok(prediction) => {
                    let body = json!({ "prediction": prediction, "status": "success" });
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                Err(e) => {
                    eprintln!("Prediction error: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Health => {
            let response = client.get(format!("{}/", cli.endpoint)).send().await?;

            let body: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }

        Commands::RemotePredict { features } => {
            let response = client
                .post(format!("{}/predict", cli.endpoint))
                .json(&json!({ "features": features }))
                .send()
                .await?;

            let status = response.status();
            let body: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);

            if !status.is_success() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
