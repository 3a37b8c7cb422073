use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing::info;

use medtag::artifacts::ArtifactStore;
use medtag::config::Config;
use medtag::embedding::onnx::SentenceEmbedder;
use medtag::embedding::traits::TextEmbedder;
use medtag::output::terminal;
use medtag::predictor::{PredictError, Predictor, PredictorSettings};
use medtag::retrain::{RetrainOutcome, Retrainer};
use medtag::training::{Trainer, TrainerSettings};

/// Medtag: multi-label topic classification for medical articles.
///
/// Trains a one-vs-rest classifier on sentence embeddings of title + abstract,
/// predicts labels for new articles, and folds human corrections back in.
#[derive(Parser)]
#[command(name = "medtag", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the sentence embedding model (~90 MB)
    DownloadModel,

    /// Train on the base corpus and write all artifacts
    Train,

    /// Merge the corrections file into the corpus and retrain
    Retrain,

    /// Predict labels for one article
    Predict {
        /// Article title
        #[arg(long)]
        title: String,

        /// Article abstract
        #[arg(long = "abstract", default_value = "")]
        abstract_text: String,

        /// Print the result as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show the classification report of the last training run
    Report {
        /// Which partition's report to show
        #[arg(long, value_enum, default_value = "test")]
        split: Split,
    },

    /// Show artifact status (presence, age, size)
    Status,
}

#[derive(Clone, Copy, ValueEnum)]
enum Split {
    Train,
    Test,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("medtag=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::DownloadModel => {
            let config = Config::load()?;
            let model_dir = &config.model_dir;

            println!("Downloading ONNX models...");
            println!("  Destination: {}", model_dir.display());

            medtag::embedding::download::download_model(model_dir).await?;

            println!("\n{}", "Models downloaded successfully.".bold());
            println!("You can now run `medtag train`.");
        }

        Commands::Train => {
            let config = Config::load()?;
            config.require_embedder()?;

            let articles = medtag::corpus::load_articles(&config.data_path)?;
            println!("Training on {} articles...", articles.len());

            let embedder = load_embedder(&config, true)?;
            let store = ArtifactStore::new(&config.artifacts_dir);
            let trainer = Trainer::new(embedder.as_ref(), &store, TrainerSettings::from(&config));
            let evaluation = trainer.train(&articles)?;

            terminal::display_evaluation_summary(&evaluation);
            println!(
                "\n{}",
                format!("Artifacts written to {}", store.dir().display()).bold()
            );
        }

        Commands::Retrain => {
            let config = Config::load()?;
            let retrainer = Retrainer::from_config(&config);

            // Check before loading the model so a no-op retrain stays cheap
            if !retrainer.corrections_path().is_file() {
                println!(
                    "No corrections at {}; nothing to retrain.",
                    retrainer.corrections_path().display()
                );
                return Ok(());
            }

            config.require_embedder()?;
            let embedder = load_embedder(&config, true)?;
            let store = ArtifactStore::new(&config.artifacts_dir);
            let trainer = Trainer::new(embedder.as_ref(), &store, TrainerSettings::from(&config));

            match retrainer.run(&trainer)? {
                RetrainOutcome::Skipped { reason } => {
                    println!("Retrain skipped: {reason}");
                }
                RetrainOutcome::Retrained {
                    base_rows,
                    correction_rows,
                    merged_rows,
                    consumed_to,
                    evaluation,
                } => {
                    println!(
                        "Merged {base_rows} base rows with {correction_rows} corrections ({merged_rows} after dedup)"
                    );
                    terminal::display_evaluation_summary(&evaluation);
                    println!(
                        "\n{}",
                        format!("Corrections moved to {}", consumed_to.display()).dimmed()
                    );
                }
            }
        }

        Commands::Predict {
            title,
            abstract_text,
            json,
        } => {
            let config = Config::load()?;
            let store = ArtifactStore::new(&config.artifacts_dir);
            let predictor = Predictor::load(&store, PredictorSettings::from(&config), || {
                config.require_embedder()?;
                load_embedder(&config, false)
            });

            match predictor.predict(&title, &abstract_text) {
                Ok(prediction) if json => {
                    println!("{}", serde_json::to_string_pretty(&prediction)?);
                }
                Ok(prediction) => terminal::display_prediction(&title, &prediction),
                Err(PredictError::NotReady { reason }) => {
                    terminal::display_not_ready(&reason);
                    std::process::exit(1);
                }
                Err(e) => return Err(e).context("Prediction failed"),
            }
        }

        Commands::Report { split } => {
            let config = Config::load()?;
            let store = ArtifactStore::new(&config.artifacts_dir);
            let loaded = store.load_evaluation()?;
            info!(created_at = %loaded.created_at, "Loaded evaluation");

            let evaluation = loaded.value;
            match split {
                Split::Train => terminal::display_report("Train Report", &evaluation.train_report),
                Split::Test => {
                    terminal::display_report("Test Report", &evaluation.test_report);
                    terminal::display_evaluation_summary(&evaluation);
                }
            }
        }

        Commands::Status => {
            let config = Config::load()?;
            medtag::status::show(&ArtifactStore::new(&config.artifacts_dir))?;
        }
    }

    Ok(())
}

fn load_embedder(config: &Config, show_progress: bool) -> Result<Box<dyn TextEmbedder>> {
    let embedder = SentenceEmbedder::load(&config.embedding_model_dir())?.with_progress(show_progress);
    Ok(Box::new(embedder))
}
