use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vista_chess::{ChessParams, PatternSize};
use vista_core::FeatureConfig;
use vista_match::FilterPolicy;

use crate::error::{VistaError, VistaResult};

/// Config file picked up from the working directory when present
pub const DEFAULT_CONFIG_FILE: &str = "vista.toml";

/// One rectification run: input image name and output image name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RectifyJob {
    pub input: String,
    pub output: String,
}

impl RectifyJob {
    pub fn new(input: &str, output: &str) -> Self {
        Self {
            input: input.to_string(),
            output: output.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectifyConfig {
    /// Size of the rectified output image
    pub width: u32,
    pub height: u32,
    /// Row-major index of the corner used from each quadrant
    pub anchor_index: usize,
    pub marker_radius: i32,
    /// When set, the marker-annotated source is also written as
    /// `<output stem><suffix>.<ext>`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotated_suffix: Option<String>,
    pub pattern: PatternSize,
    pub chess: ChessParams,
    pub jobs: Vec<RectifyJob>,
}

impl Default for RectifyConfig {
    fn default() -> Self {
        Self {
            width: 960,
            height: 540,
            anchor_index: 4,
            marker_radius: 5,
            annotated_suffix: None,
            pattern: PatternSize::default(),
            chess: ChessParams::default(),
            jobs: vec![
                RectifyJob::new("img5_modified.jpg", "projected.jpg"),
                RectifyJob::new("img5.jpg", "orig_projected.jpg"),
            ],
        }
    }
}

/// Settings for both pipelines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VistaConfig {
    pub materials_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Images matched pairwise, in pair-enumeration order
    pub match_inputs: Vec<String>,
    /// Gaussian sigma applied before descriptor sampling; 0 disables it
    pub blur_sigma: f32,
    pub feature: FeatureConfig,
    pub filter: FilterPolicy,
    pub rectify: RectifyConfig,
}

impl Default for VistaConfig {
    fn default() -> Self {
        Self {
            materials_dir: PathBuf::from("materials"),
            output_dir: PathBuf::from("output"),
            match_inputs: (1..=4).map(|i| format!("img{}.jpg", i)).collect(),
            blur_sigma: 2.0,
            feature: FeatureConfig::default(),
            filter: FilterPolicy::default(),
            rectify: RectifyConfig::default(),
        }
    }
}

fn invalid(msg: impl Into<String>) -> VistaError {
    VistaError::InvalidConfig(msg.into())
}

impl VistaConfig {
    pub fn input_path(&self, name: &str) -> PathBuf {
        self.materials_dir.join(name)
    }

    pub fn output_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> VistaResult<()> {
        let f = &self.feature;
        if f.threshold == 0 || f.threshold > 127 {
            return Err(invalid(format!("feature.threshold must be in 1..=127, got {}", f.threshold)));
        }
        if f.patch_size < 5 || f.patch_size % 2 == 0 {
            return Err(invalid(format!("feature.patch_size must be odd and >= 5, got {}", f.patch_size)));
        }
        if f.n_threads == 0 {
            return Err(invalid("feature.n_threads must be positive"));
        }
        if self.blur_sigma.is_nan() || self.blur_sigma < 0.0 {
            return Err(invalid(format!("blur_sigma must be non-negative, got {}", self.blur_sigma)));
        }
        if self.filter.ratio.is_nan() || self.filter.ratio < 0.0 || self.filter.floor.is_nan() || self.filter.floor < 0.0 {
            return Err(invalid("filter.ratio and filter.floor must be non-negative"));
        }

        let r = &self.rectify;
        if r.width == 0 || r.height == 0 {
            return Err(invalid(format!("rectify output size {}x{} is empty", r.width, r.height)));
        }
        if r.pattern.cols < 2 || r.pattern.rows < 2 {
            return Err(invalid(format!(
                "rectify.pattern must be at least 2x2, got {}x{}",
                r.pattern.cols, r.pattern.rows
            )));
        }
        if r.anchor_index >= r.pattern.cols * r.pattern.rows {
            return Err(invalid(format!(
                "rectify.anchor_index {} outside a {}x{} pattern",
                r.anchor_index, r.pattern.cols, r.pattern.rows
            )));
        }
        if r.marker_radius < 0 {
            return Err(invalid("rectify.marker_radius must be non-negative"));
        }
        let rel = r.chess.threshold_rel;
        if rel.is_nan() || rel <= 0.0 || rel >= 1.0 {
            return Err(invalid("rectify.chess.threshold_rel must be in (0, 1)"));
        }
        Ok(())
    }

    pub fn from_toml_str(s: &str) -> VistaResult<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> VistaResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn from_json_str(s: &str) -> VistaResult<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> VistaResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load configuration from a TOML file
    pub fn load_toml<P: AsRef<Path>>(path: P) -> VistaResult<Self> {
        Self::from_toml_str(&read(path.as_ref())?)
    }

    /// Save configuration to a TOML file
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> VistaResult<()> {
        write(path.as_ref(), &self.to_toml_string()?)
    }

    /// Load configuration from a JSON file
    pub fn load_json<P: AsRef<Path>>(path: P) -> VistaResult<Self> {
        Self::from_json_str(&read(path.as_ref())?)
    }

    /// Save configuration to a JSON file
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> VistaResult<()> {
        write(path.as_ref(), &self.to_json_string()?)
    }

    /// `vista.toml` from the working directory, or defaults when absent
    pub fn discover() -> VistaResult<Self> {
        let path = Path::new(DEFAULT_CONFIG_FILE);
        if path.is_file() {
            log::info!("loading configuration from {}", path.display());
            Self::load_toml(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "VistaConfig: materials={}, output={}, threshold={}, patch={}, blur_sigma={}, filter=[ratio:{}, floor:{}], rectify={}x{}",
            self.materials_dir.display(),
            self.output_dir.display(),
            self.feature.threshold,
            self.feature.patch_size,
            self.blur_sigma,
            self.filter.ratio,
            self.filter.floor,
            self.rectify.width,
            self.rectify.height
        )
    }
}

fn read(path: &Path) -> VistaResult<String> {
    std::fs::read_to_string(path).map_err(|source| VistaError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write(path: &Path, content: &str) -> VistaResult<()> {
    std::fs::write(path, content).map_err(|source| VistaError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_fixed_layout() {
        let cfg = VistaConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.input_path("img1.jpg"), PathBuf::from("materials/img1.jpg"));
        assert_eq!(cfg.output_path("projected.jpg"), PathBuf::from("output/projected.jpg"));
        assert_eq!(cfg.match_inputs, vec!["img1.jpg", "img2.jpg", "img3.jpg", "img4.jpg"]);
        assert_eq!((cfg.rectify.width, cfg.rectify.height), (960, 540));
        assert_eq!(cfg.rectify.anchor_index, 4);
        assert_eq!(cfg.rectify.jobs[0], RectifyJob::new("img5_modified.jpg", "projected.jpg"));
        assert_eq!(cfg.rectify.jobs[1], RectifyJob::new("img5.jpg", "orig_projected.jpg"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg = VistaConfig::from_toml_str(
            r#"
            output_dir = "out"
            blur_sigma = 1.5

            [feature]
            threshold = 35

            [rectify]
            width = 640
            annotated_suffix = "_corners"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.output_dir, PathBuf::from("out"));
        assert_eq!(cfg.materials_dir, PathBuf::from("materials"));
        assert_eq!(cfg.blur_sigma, 1.5);
        assert_eq!(cfg.feature.threshold, 35);
        assert_eq!(cfg.feature.patch_size, 31);
        assert_eq!(cfg.rectify.width, 640);
        assert_eq!(cfg.rectify.height, 540);
        assert_eq!(cfg.rectify.annotated_suffix.as_deref(), Some("_corners"));
        assert_eq!(cfg.rectify.jobs.len(), 2);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            VistaConfig::from_toml_str("blur_sigma = -1.0"),
            Err(VistaError::InvalidConfig(_))
        ));
        assert!(matches!(
            VistaConfig::from_toml_str("[feature]\npatch_size = 30"),
            Err(VistaError::InvalidConfig(_))
        ));
        assert!(matches!(
            VistaConfig::from_toml_str("[feature]\npatch_size = 3"),
            Err(VistaError::InvalidConfig(_))
        ));
        assert!(VistaConfig::from_toml_str("[feature]\npatch_size = 5").is_ok());
        assert!(matches!(
            VistaConfig::from_toml_str("[rectify]\nanchor_index = 9"),
            Err(VistaError::InvalidConfig(_))
        ));
        assert!(matches!(
            VistaConfig::from_json_str("{\"feature\": {\"threshold\": 0}}"),
            Err(VistaError::InvalidConfig(_))
        ));
        assert!(matches!(
            VistaConfig::from_toml_str("blur_sigma = \"wide\""),
            Err(VistaError::TomlParse(_))
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = VistaConfig::default();
        cfg.rectify.annotated_suffix = Some("_marked".into());
        cfg.filter.ratio = 2.0;

        let toml_path = dir.path().join("vista.toml");
        cfg.save_toml(&toml_path).unwrap();
        assert_eq!(VistaConfig::load_toml(&toml_path).unwrap(), cfg);

        let json_path = dir.path().join("vista.json");
        cfg.save_json(&json_path).unwrap();
        assert_eq!(VistaConfig::load_json(&json_path).unwrap(), cfg);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = VistaConfig::load_toml("/nonexistent/vista.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/vista.toml"));
    }
}
