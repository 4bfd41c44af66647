//! Model artifact storage
//!
//! A trained session is stored as one gzip-compressed JSON document holding
//! the fitted models and the configuration they were trained under. Writes
//! go through a temporary file in the destination directory and are renamed
//! into place, so a crash never leaves a half-written artifact behind.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::info;

use crate::config::RecommenderConfig;
use crate::error::{Error, Result};
use crate::forecast::TrainedModels;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub saved_at: DateTime<Utc>,
    pub config: RecommenderConfig,
    pub models: TrainedModels,
}

impl ModelArtifact {
    pub fn new(config: RecommenderConfig, models: TrainedModels) -> Self {
        Self {
            saved_at: Utc::now(),
            config,
            models,
        }
    }
}

/// Write an artifact atomically
pub fn save_artifact(artifact: &ModelArtifact, path: &Path) -> Result<()> {
    if artifact.models.is_empty() {
        return Err(Error::ModelNotTrained("no models to save".into()));
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }

    let tmp = NamedTempFile::new_in(dir)?;
    {
        let writer = BufWriter::new(tmp.as_file());
        let mut encoder = GzEncoder::new(writer, Compression::default());
        serde_json::to_writer(&mut encoder, artifact)?;
        let mut writer = encoder.finish()?;
        writer.flush()?;
    }
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;

    info!(
        "Saved {} model(s) to {}",
        artifact.models.len(),
        path.display()
    );
    Ok(())
}

/// Read a whole artifact; nothing is returned unless it decodes fully
pub fn load_artifact(path: &Path) -> Result<ModelArtifact> {
    let file = File::open(path)?;
    let decoder = GzDecoder::new(BufReader::new(file));
    let artifact: ModelArtifact = serde_json::from_reader(decoder)?;
    artifact.config.validate()?;

    info!(
        "Loaded {} model(s) from {} (saved {})",
        artifact.models.len(),
        path.display(),
        artifact.saved_at.format("%Y-%m-%d %H:%M")
    );
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::train;
    use crate::models::MonthlyAggregate;
    use std::collections::BTreeMap;

    fn models() -> TrainedModels {
        let monthly: Vec<MonthlyAggregate> = (1..=4)
            .map(|m| MonthlyAggregate {
                month_num: m,
                income: 1000.0,
                categories: BTreeMap::new(),
                total_expenses: 500.0 + m as f64 * 10.0,
                essential_expenses: 300.0,
                non_essential_expenses: 200.0 + m as f64 * 10.0,
                essential_ratio: 0.6,
                discretionary_ratio: 0.4,
            })
            .collect();
        let mut config = RecommenderConfig::default();
        config.forecast.n_estimators = 5;
        train(&monthly, &config).unwrap()
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("models.json.gz");

        let artifact = ModelArtifact::new(RecommenderConfig::default(), models());
        save_artifact(&artifact, &path).unwrap();

        let loaded = load_artifact(&path).unwrap();
        assert_eq!(loaded.models, artifact.models);
        assert_eq!(loaded.config, artifact.config);
        assert_eq!(loaded.saved_at, artifact.saved_at);
    }

    #[test]
    fn test_save_without_models() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = ModelArtifact::new(RecommenderConfig::default(), TrainedModels::new());
        let err = save_artifact(&artifact, &dir.path().join("m.gz")).unwrap_err();
        assert!(matches!(err, Error::ModelNotTrained(_)));
    }

    #[test]
    fn test_load_garbage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.gz");
        fs::write(&path, b"not gzip").unwrap();
        assert!(load_artifact(&path).is_err());
        assert!(load_artifact(&dir.path().join("missing.gz")).is_err());
    }
}
