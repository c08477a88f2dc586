use crate::artifacts::error::{ArtifactResult, StartupArtifactError};
use crate::artifacts::model::{Model, ModelArtifact};
use crate::artifacts::scaler::{Scaler, ScalerArtifact};
use crate::artifacts::state::{ArtifactKind, ArtifactReport, ServiceState};
use crate::config::ArtifactsConfig;
use crate::metrics::ARTIFACT_LOADED;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Encoding of an artifact file
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ArtifactFormat {
    /// Pick by file extension
    #[default]
    Auto,
    Json,
    Bincode,
}

impl ArtifactFormat {
    /// Resolve `Auto` against a concrete path
    pub fn for_path(self, path: &Path) -> ArtifactFormat {
        match self {
            ArtifactFormat::Auto => match path.extension().and_then(|e| e.to_str()) {
                Some("bin") | Some("bincode") => ArtifactFormat::Bincode,
                _ => ArtifactFormat::Json,
            },
            other => other,
        }
    }
}

/// Absolute locations of the two artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub scaler: PathBuf,
}

impl ArtifactPaths {
    /// Resolve configured file names against the deployment directory.
    ///
    /// A relative `dir` is taken relative to `base`; absolute file names win
    /// over `dir` entirely.
    pub fn resolve(config: &ArtifactsConfig, base: &Path) -> Self {
        let dir = match &config.dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => base.join(dir),
            None => base.to_path_buf(),
        };

        Self {
            model: dir.join(&config.model_file),
            scaler: dir.join(&config.scaler_file),
        }
    }
}

/// Directory containing the running executable, falling back to the working
/// directory when it cannot be determined.
pub fn deployment_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Loads the model and scaler once at startup.
///
/// Loading never fails the caller: every outcome is folded into the
/// returned [`ServiceState`].
pub struct ArtifactLoader {
    paths: ArtifactPaths,
    format: ArtifactFormat,
}

impl ArtifactLoader {
    pub fn new(paths: ArtifactPaths, format: ArtifactFormat) -> Self {
        Self { paths, format }
    }

    /// Build a loader from configuration, resolving paths against the
    /// deployment directory
    pub fn from_config(config: &ArtifactsConfig) -> Self {
        Self::new(ArtifactPaths::resolve(config, &deployment_dir()), config.format)
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    /// Attempt to load both artifacts and transition out of `Uninitialized`
    pub fn load(&self) -> ServiceState {
        let model = self.load_model();
        let scaler = self.load_scaler();

        let (model, model_report) = split(model, ArtifactKind::Model, &self.paths.model);
        let (scaler, scaler_report) = split(scaler, ArtifactKind::Scaler, &self.paths.scaler);

        ARTIFACT_LOADED
            .with_label_values(&["model"])
            .set(if model.is_some() { 1.0 } else { 0.0 });
        ARTIFACT_LOADED
            .with_label_values(&["scaler"])
            .set(if scaler.is_some() { 1.0 } else { 0.0 });

        let mut failure = None;
        if let (Some(m), Some(s)) = (&model, &scaler) {
            if let (Some(model_width), Some(scaler_width)) = (m.n_features(), s.n_features()) {
                if model_width != scaler_width {
                    let err = StartupArtifactError::Incompatible {
                        scaler: scaler_width,
                        model: model_width,
                    };
                    error!("Error loading artifacts: {}", err);
                    failure = Some(err.to_string());
                }
            }
        }

        let state =
            ServiceState::from_load(model, scaler, vec![model_report, scaler_report], failure);

        if state.is_ready() {
            info!(
                model = %self.paths.model.display(),
                scaler = %self.paths.scaler.display(),
                "Model and scaler loaded successfully"
            );
        } else {
            warn!("Artifacts not loaded; prediction endpoint will report service not ready");
        }

        state
    }

    fn load_model(&self) -> ArtifactResult<(Arc<dyn Model>, FileInfo)> {
        let (artifact, info): (ModelArtifact, _) = read_artifact(&self.paths.model, self.format)?;
        artifact.validate().map_err(|e| StartupArtifactError::Corrupt {
            path: self.paths.model.clone(),
            message: e.to_string(),
        })?;
        info!(kind = artifact.kind(), n_features = ?artifact.n_features(), "Model artifact decoded");
        Ok((Arc::new(artifact), info))
    }

    fn load_scaler(&self) -> ArtifactResult<(Arc<dyn Scaler>, FileInfo)> {
        let (artifact, info): (ScalerArtifact, _) = read_artifact(&self.paths.scaler, self.format)?;
        artifact.validate().map_err(|e| StartupArtifactError::Corrupt {
            path: self.paths.scaler.clone(),
            message: e.to_string(),
        })?;
        info!(kind = artifact.kind(), n_features = ?artifact.n_features(), "Scaler artifact decoded");
        Ok((Arc::new(artifact), info))
    }
}

struct FileInfo {
    size_bytes: u64,
    sha256: String,
}

fn read_artifact<T: DeserializeOwned>(
    path: &Path,
    format: ArtifactFormat,
) -> ArtifactResult<(T, FileInfo)> {
    let bytes = std::fs::read(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => StartupArtifactError::NotFound(path.to_path_buf()),
        _ => StartupArtifactError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let info = FileInfo {
        size_bytes: bytes.len() as u64,
        sha256: format!("{:x}", Sha256::digest(&bytes)),
    };

    let value = decode(&bytes, format.for_path(path)).map_err(|message| {
        StartupArtifactError::Corrupt {
            path: path.to_path_buf(),
            message,
        }
    })?;

    Ok((value, info))
}

/// Decode artifact bytes in a concrete (non-`Auto`) format
pub fn decode<T: DeserializeOwned>(bytes: &[u8], format: ArtifactFormat) -> Result<T, String> {
    match format {
        ArtifactFormat::Bincode => bincode::deserialize(bytes).map_err(|e| e.to_string()),
        ArtifactFormat::Json | ArtifactFormat::Auto => {
            serde_json::from_slice(bytes).map_err(|e| e.to_string())
        }
    }
}

/// Encode an artifact; used by fixtures and tooling that produce artifacts
pub fn encode<T: Serialize>(value: &T, format: ArtifactFormat) -> Result<Vec<u8>, String> {
    match format {
        ArtifactFormat::Bincode => bincode::serialize(value).map_err(|e| e.to_string()),
        ArtifactFormat::Json | ArtifactFormat::Auto => {
            serde_json::to_vec_pretty(value).map_err(|e| e.to_string())
        }
    }
}

fn split<T>(
    result: ArtifactResult<(T, FileInfo)>,
    kind: ArtifactKind,
    path: &Path,
) -> (Option<T>, ArtifactReport) {
    match result {
        Ok((value, info)) => {
            info!(
                artifact = %kind,
                path = %path.display(),
                size_bytes = info.size_bytes,
                sha256 = %info.sha256,
                "Artifact loaded"
            );
            (
                Some(value),
                ArtifactReport::loaded(kind, path.to_path_buf(), info.size_bytes, info.sha256),
            )
        }
        Err(e) => {
            error!(artifact = %kind, "Error loading artifacts: {}", e);
            (None, ArtifactReport::failed(kind, path.to_path_buf(), e.to_string()))
        }
    }
}
