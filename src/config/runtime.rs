use crate::error::{IntegrationError, Result};
use crate::integration::IntegrationParams;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Files written after a run; every entry is optional.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub mesh_ply: Option<PathBuf>,
    pub wu_png: Option<PathBuf>,
    pub wv_png: Option<PathBuf>,
    pub report_json: Option<PathBuf>,
}

impl OutputConfig {
    pub fn is_empty(&self) -> bool {
        self.mesh_ply.is_none()
            && self.wu_png.is_none()
            && self.wv_png.is_none()
            && self.report_json.is_none()
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct RuntimeConfig {
    pub normal_map: PathBuf,
    /// Validity mask; every pixel is valid when absent.
    #[serde(default)]
    pub mask: Option<PathBuf>,
    /// `K.txt` with nine numbers; orthographic projection when absent.
    #[serde(default)]
    pub intrinsics: Option<PathBuf>,
    #[serde(default)]
    pub params: IntegrationParams,
    #[serde(default)]
    pub output: OutputConfig,
}

impl RuntimeConfig {
    /// Resolve relative paths against `base` (the config file's directory).
    pub fn resolve_relative_to(mut self, base: &Path) -> Self {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        join(&mut self.normal_map);
        for p in [
            &mut self.mask,
            &mut self.intrinsics,
            &mut self.output.mesh_ply,
            &mut self.output.wu_png,
            &mut self.output.wv_png,
            &mut self.output.report_json,
        ]
        .into_iter()
        .flatten()
        {
            join(p);
        }
        self
    }
}

/// Read and validate a runtime config. Relative paths inside the file are
/// taken relative to the file's own directory.
pub fn load_config(path: &Path) -> Result<RuntimeConfig> {
    let contents = fs::read_to_string(path).map_err(|source| IntegrationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: RuntimeConfig =
        serde_json::from_str(&contents).map_err(|source| IntegrationError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    config.params.validate()?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(config.resolve_relative_to(base))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::params::Preconditioner;

    fn write(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("config.json");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), r#"{ "normal_map": "normal.png" }"#);
        let config = load_config(&path).unwrap();
        assert_eq!(config.normal_map, dir.path().join("normal.png"));
        assert!(config.mask.is_none());
        assert!(config.intrinsics.is_none());
        assert!(config.output.is_empty());
        assert_eq!(config.params.k, 2.0);
        assert_eq!(config.params.max_iter, 100);
        assert_eq!(config.params.preconditioner, Preconditioner::None);
    }

    #[test]
    fn full_config_round_trips_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            r#"{
                "normal_map": "/data/normal.png",
                "mask": "mask.png",
                "intrinsics": "K.txt",
                "params": { "k": 4.0, "max_iter": 20, "preconditioner": "jacobi" },
                "output": { "mesh_ply": "out/mesh.ply", "report_json": "out/report.json" }
            }"#,
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.normal_map, PathBuf::from("/data/normal.png"));
        assert_eq!(config.mask, Some(dir.path().join("mask.png")));
        assert_eq!(config.intrinsics, Some(dir.path().join("K.txt")));
        assert_eq!(config.params.k, 4.0);
        assert_eq!(config.params.max_iter, 20);
        assert_eq!(config.params.cg_max_iter, 500);
        assert_eq!(config.params.preconditioner, Preconditioner::Jacobi);
        assert_eq!(
            config.output.mesh_ply,
            Some(dir.path().join("out/mesh.ply"))
        );
        assert!(config.output.wu_png.is_none());
    }

    #[test]
    fn invalid_params_and_json_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            r#"{ "normal_map": "n.png", "params": { "step_size": 0.0 } }"#,
        );
        assert!(matches!(
            load_config(&path),
            Err(IntegrationError::InvalidInput(_))
        ));

        let path = write(dir.path(), r#"{ "mask": "m.png" }"#);
        assert!(matches!(load_config(&path), Err(IntegrationError::Json { .. })));

        let missing = dir.path().join("nope.json");
        assert!(matches!(load_config(&missing), Err(IntegrationError::Io { .. })));
    }
}
