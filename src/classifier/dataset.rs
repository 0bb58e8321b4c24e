use super::{ffmpeg, TrainingError};
use hound::{SampleFormat, WavReader};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// GTZAN genre names, used when no explicit genre list is given.
pub const DEFAULT_GENRES: [&str; 10] = [
    "blues",
    "classical",
    "country",
    "disco",
    "hiphop",
    "jazz",
    "metal",
    "pop",
    "reggae",
    "rock",
];

/// Sample rate the embedding extractor expects.
pub const TARGET_SAMPLE_RATE: u32 = 16000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledFile {
    pub path: PathBuf,
    pub label: String,
}

/// Extensions picked up by [`scan_dataset`]. WAV is decoded in-process,
/// everything else goes through ffmpeg.
pub const AUDIO_EXTENSIONS: [&str; 5] = ["wav", "mp3", "flac", "ogg", "au"];

fn has_extension(path: &Path, accepted: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| accepted.iter().any(|a| ext.eq_ignore_ascii_case(a)))
        .unwrap_or(false)
}

fn is_wav(path: &Path) -> bool {
    has_extension(path, &["wav"])
}

fn is_audio_file(path: &Path) -> bool {
    has_extension(path, &AUDIO_EXTENSIONS)
}

fn list_subdirectories(root: &Path) -> Result<Vec<String>, TrainingError> {
    let mut names = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_dir() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    Ok(names)
}

/// Lists audio files found directly under `{root}/{genre}`.
///
/// With `genres` set, every listed genre must have a directory. Without it,
/// every subdirectory of `root` is a genre. Files come back grouped by genre
/// in the given order, sorted by name within a genre.
pub fn scan_dataset(
    root: &Path,
    genres: Option<&[String]>,
) -> Result<Vec<LabeledFile>, TrainingError> {
    if !root.is_dir() {
        return Err(TrainingError::InvalidDataset(format!(
            "{:?} is not a directory",
            root
        )));
    }

    let genres = match genres {
        Some(genres) => genres.to_vec(),
        None => list_subdirectories(root)?,
    };

    let mut files = Vec::new();
    for genre in &genres {
        let genre_dir = root.join(genre);
        if !genre_dir.is_dir() {
            return Err(TrainingError::MissingGenre(genre_dir));
        }

        for entry in WalkDir::new(&genre_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            if entry.file_type().is_file() && is_audio_file(entry.path()) {
                files.push(LabeledFile {
                    path: entry.into_path(),
                    label: genre.clone(),
                });
            }
        }
    }

    debug!("Found {} audio files in {} genres", files.len(), genres.len());
    Ok(files)
}

fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    let scale = 1.0 / channels as f32;
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect()
}

fn resample(samples: Vec<f32>, from_rate: u32, to_rate: u32) -> Result<Vec<f32>, TrainingError> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples);
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, samples.len(), 1)
        .map_err(|e| TrainingError::Resample(e.to_string()))?;
    let input = vec![samples];
    let mut output = resampler
        .process(&input, None)
        .map_err(|e| TrainingError::Resample(e.to_string()))?;
    Ok(output.pop().unwrap_or_default())
}

/// Decodes an audio file into mono samples at [`TARGET_SAMPLE_RATE`].
pub async fn load_waveform(path: &Path) -> Result<Vec<f32>, TrainingError> {
    let samples = if is_wav(path) {
        load_wav(path)?
    } else {
        ffmpeg::decode_mono(path, TARGET_SAMPLE_RATE).await?
    };

    if samples.is_empty() {
        return Err(TrainingError::EmptyAudio(path.to_path_buf()));
    }
    Ok(samples)
}

fn load_wav(path: &Path) -> Result<Vec<f32>, TrainingError> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = 1.0 / (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };

    let mono = downmix(&interleaved, spec.channels as usize);
    resample(mono, spec.sample_rate, TARGET_SAMPLE_RATE)
}
