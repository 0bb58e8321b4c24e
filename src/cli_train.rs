use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli_style;
use cli_style::{
    get_styles, print_error, print_key_value, print_section_header, print_success,
    print_warning, TableBuilder,
};

use composer_server::classifier::{
    check_ffmpeg_available, extract_dataset, scan_dataset, train, GenreClassifier,
    HttpEmbeddingExtractor, LabelEncoder, TrainedClassifier, TrainingConfig, DEFAULT_GENRES,
    LABELS_FILE_NAME, WEIGHTS_FILE_NAME,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(styles=get_styles())]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extracts embeddings from a genre dataset and trains the classifier.
    Train {
        /// Directory with one subdirectory of audio files per genre.
        /// Anything other than WAV is decoded with ffmpeg.
        #[clap(value_parser = parse_path)]
        dataset: PathBuf,

        /// Where the trained weights and label list are written.
        #[clap(long, default_value = "model", value_parser = parse_path)]
        model_dir: PathBuf,

        /// URL of the embedding service.
        #[clap(long)]
        embedding_url: String,

        /// Timeout in seconds for a single embedding call.
        #[clap(long, default_value_t = 120)]
        embedding_timeout_sec: u64,

        /// Comma separated genres to train on. Defaults to the GTZAN genres.
        #[clap(long, value_delimiter = ',')]
        genres: Vec<String>,

        /// Use every subdirectory of the dataset as a genre.
        #[clap(long, conflicts_with = "genres")]
        all_genres: bool,

        #[clap(long, default_value_t = 30)]
        epochs: usize,

        #[clap(long, default_value_t = 16)]
        batch_size: usize,

        #[clap(long, default_value_t = 1e-3)]
        learning_rate: f64,

        /// Seed for the train/test split and batch shuffling.
        #[clap(long, default_value_t = 42)]
        seed: u64,
    },

    /// Checks that a trained classifier exists and loads.
    Check {
        #[clap(long, default_value = "model", value_parser = parse_path)]
        model_dir: PathBuf,
    },
}

fn print_model_summary(input_dim: usize, num_classes: usize) {
    print_section_header("Model");
    let layers = GenreClassifier::layer_summary(input_dim, num_classes);
    let mut table = TableBuilder::new(vec!["Layer", "Output Shape", "Param #"]);
    for layer in &layers {
        table.add_row(vec![
            layer.name.to_string(),
            format!("(None, {})", layer.output_dim),
            layer.params.to_string(),
        ]);
    }
    table.print();
    let total: usize = layers.iter().map(|l| l.params).sum();
    print_key_value("Total params", &total.to_string());
}

async fn run_train(
    dataset: &Path,
    model_dir: &Path,
    embedding_url: String,
    embedding_timeout_sec: u64,
    genres: Option<Vec<String>>,
    config: TrainingConfig,
) -> Result<()> {
    print_section_header("Dataset");
    let files = scan_dataset(dataset, genres.as_deref())
        .with_context(|| format!("Failed to scan dataset {:?}", dataset))?;
    print_key_value("Path", &dataset.display().to_string());
    print_key_value("Audio files", &files.len().to_string());
    if files.is_empty() {
        anyhow::bail!("No audio files found in {:?}", dataset);
    }
    let compressed = files
        .iter()
        .filter(|f| {
            f.path
                .extension()
                .is_some_and(|ext| !ext.eq_ignore_ascii_case("wav"))
        })
        .count();
    if compressed > 0 {
        check_ffmpeg_available()
            .await
            .with_context(|| format!("{} files need ffmpeg to decode", compressed))?;
    }

    info!("Extracting embeddings from dataset...");
    let extractor = HttpEmbeddingExtractor::new(embedding_url, embedding_timeout_sec)?;
    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?,
    );
    let embeddings = extract_dataset(&files, &extractor, &progress).await?;

    let labels = LabelEncoder::fit(&embeddings.labels);
    print_model_summary(embeddings.feature_dim()?, labels.len());

    print_section_header("Training");
    let trained = train(&embeddings, &config)?;
    if let Some(last) = trained.reports.last() {
        print_key_value("Final loss", &format!("{:.4}", last.train_loss));
        print_key_value("Held-out accuracy", &format!("{:.4}", last.test_accuracy));
    }

    trained
        .save(model_dir)
        .with_context(|| format!("Failed to save model to {:?}", model_dir))?;
    print_success(&format!(
        "Genre classifier saved: {}",
        model_dir.join(WEIGHTS_FILE_NAME).display()
    ));
    Ok(())
}

fn run_check(model_dir: &Path) {
    print_section_header("Checking model files");
    let weights_path = model_dir.join(WEIGHTS_FILE_NAME);
    let labels_path = model_dir.join(LABELS_FILE_NAME);
    print_key_value(
        &format!("{} exists", WEIGHTS_FILE_NAME),
        &weights_path.exists().to_string(),
    );
    print_key_value(
        &format!("{} exists", LABELS_FILE_NAME),
        &labels_path.exists().to_string(),
    );

    if !weights_path.exists() || !labels_path.exists() {
        print_warning("Nothing to load, train a model first");
        return;
    }

    match TrainedClassifier::load(model_dir) {
        Ok((model, labels)) => {
            print_key_value("Genres", &labels.classes().join(", "));
            print_key_value("Input width", &model.input_dim().to_string());
            print_success("Genre model loaded successfully");
        }
        Err(err) => print_error(&format!("Genre model error: {}", err)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    match cli_args.command {
        Command::Train {
            dataset,
            model_dir,
            embedding_url,
            embedding_timeout_sec,
            genres,
            all_genres,
            epochs,
            batch_size,
            learning_rate,
            seed,
        } => {
            let genres = if all_genres {
                None
            } else if genres.is_empty() {
                Some(DEFAULT_GENRES.iter().map(|g| g.to_string()).collect())
            } else {
                Some(genres)
            };
            let config = TrainingConfig {
                epochs,
                batch_size,
                learning_rate,
                seed,
                ..Default::default()
            };
            run_train(
                &dataset,
                &model_dir,
                embedding_url,
                embedding_timeout_sec,
                genres,
                config,
            )
            .await
        }
        Command::Check { model_dir } => {
            run_check(&model_dir);
            Ok(())
        }
    }
}
