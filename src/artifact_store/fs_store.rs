//! Filesystem artifact store writing canonical 16-bit PCM WAV files.

use super::{
    artifact_file_name, is_valid_artifact_id, ArtifactStore, ArtifactStoreError,
    GeneratedArtifact,
};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Stores each artifact as `{dir}/music_{id}.wav`.
pub struct FsArtifactStore {
    dir: PathBuf,
}

impl FsArtifactStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ArtifactStoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(artifact_file_name(id))
    }
}

impl ArtifactStore for FsArtifactStore {
    fn write(&self, artifact: &GeneratedArtifact) -> Result<(), ArtifactStoreError> {
        if !is_valid_artifact_id(&artifact.id) {
            return Err(ArtifactStoreError::InvalidArtifact(format!(
                "invalid id {:?}",
                artifact.id
            )));
        }
        if artifact.sample_rate == 0 {
            return Err(ArtifactStoreError::InvalidArtifact(
                "sample rate must be positive".to_string(),
            ));
        }
        if artifact.channels == 0 || artifact.samples.len() % artifact.channels as usize != 0 {
            return Err(ArtifactStoreError::InvalidArtifact(format!(
                "{} samples cannot be split into {} channels",
                artifact.samples.len(),
                artifact.channels
            )));
        }

        let spec = WavSpec {
            channels: artifact.channels,
            sample_rate: artifact.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        // Encode next to the destination, then rename over it.
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = WavWriter::new(BufWriter::new(tmp.as_file_mut()), spec)?;
            for &sample in &artifact.samples {
                writer.write_sample(sample)?;
            }
            writer.finalize()?;
        }

        let path = self.path_for(&artifact.id);
        tmp.persist(&path).map_err(|e| e.error)?;
        debug!(
            "Wrote artifact {} ({} samples @ {} Hz) to {}",
            artifact.id,
            artifact.samples.len(),
            artifact.sample_rate,
            path.display()
        );
        Ok(())
    }

    fn read(&self, id: &str) -> Result<Vec<u8>, ArtifactStoreError> {
        if !is_valid_artifact_id(id) {
            return Err(ArtifactStoreError::NotFound(id.to_string()));
        }
        match std::fs::read(self.path_for(id)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ArtifactStoreError::NotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn make_store() -> (TempDir, FsArtifactStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(temp_dir.path().join("generated_audio")).unwrap();
        (temp_dir, store)
    }

    fn decode(bytes: Vec<u8>) -> (WavSpec, Vec<i16>) {
        let mut reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        let samples = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        (spec, samples)
    }

    #[test]
    fn creates_directory_on_construction() {
        let (_temp_dir, store) = make_store();
        assert!(store.dir().is_dir());
    }

    #[test]
    fn written_artifact_reads_back_as_wav() {
        let (_temp_dir, store) = make_store();
        let artifact =
            GeneratedArtifact::new("abc123".to_string(), vec![0, 32767, -32767, 100], 16000, 1);

        store.write(&artifact).unwrap();
        assert!(store.path_for("abc123").exists());

        let (spec, samples) = decode(store.read("abc123").unwrap());
        assert_eq!(spec.sample_rate, 16000);
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, SampleFormat::Int);
        assert_eq!(samples, vec![0, 32767, -32767, 100]);
    }

    #[test]
    fn channel_layout_is_preserved() {
        let (_temp_dir, store) = make_store();
        let artifact = GeneratedArtifact::new("stereo".to_string(), vec![1, 2, 3, 4], 32000, 2);

        store.write(&artifact).unwrap();

        let (spec, samples) = decode(store.read("stereo").unwrap());
        assert_eq!(spec.channels, 2);
        assert_eq!(samples, vec![1, 2, 3, 4]);
    }

    #[test]
    fn write_overwrites_existing_file() {
        let (_temp_dir, store) = make_store();
        store
            .write(&GeneratedArtifact::new("same".to_string(), vec![1; 10], 8000, 1))
            .unwrap();
        store
            .write(&GeneratedArtifact::new("same".to_string(), vec![2; 4], 8000, 1))
            .unwrap();

        let (_, samples) = decode(store.read("same").unwrap());
        assert_eq!(samples, vec![2; 4]);
    }

    #[test]
    fn read_unknown_id_is_not_found() {
        let (_temp_dir, store) = make_store();
        assert!(matches!(
            store.read("doesnotexist"),
            Err(ArtifactStoreError::NotFound(_))
        ));
        assert!(matches!(
            store.read("../../etc/passwd"),
            Err(ArtifactStoreError::NotFound(_))
        ));
    }

    #[test]
    fn invalid_artifact_leaves_no_file_behind() {
        let (_temp_dir, store) = make_store();
        let artifact = GeneratedArtifact::new("odd".to_string(), vec![1, 2, 3], 16000, 2);

        assert!(matches!(
            store.write(&artifact),
            Err(ArtifactStoreError::InvalidArtifact(_))
        ));
        assert_eq!(std::fs::read_dir(store.dir()).unwrap().count(), 0);
    }

    #[test]
    fn zero_sample_rate_is_rejected() {
        let (_temp_dir, store) = make_store();
        let artifact = GeneratedArtifact::new("norate".to_string(), vec![0; 4], 0, 1);
        assert!(store.write(&artifact).is_err());
        assert!(!store.path_for("norate").exists());
    }
}
