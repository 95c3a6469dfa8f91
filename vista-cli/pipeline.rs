//! Batch runs over the materials directory.

use std::path::{Path, PathBuf};

use image::RgbImage;
use rayon::prelude::*;

use crate::config::{RectifyJob, VistaConfig};
use crate::error::{VistaError, VistaResult};
use crate::feature_matcher::FeatureMatcher;
use crate::rectify::Rectifier;

/// Outputs written and failures recorded over a run
#[derive(Debug, Default)]
pub struct RunReport {
    pub written: Vec<PathBuf>,
    pub failures: Vec<VistaError>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, result: VistaResult<PathBuf>) {
        match result {
            Ok(path) => {
                log::info!("wrote {}", path.display());
                self.written.push(path);
            }
            Err(e) => {
                log::error!("{}", e);
                self.failures.push(e);
            }
        }
    }
}

pub fn load_rgb(path: &Path) -> VistaResult<RgbImage> {
    image::open(path)
        .map(|img| img.to_rgb8())
        .map_err(|source| VistaError::ImageLoad {
            path: path.to_path_buf(),
            source,
        })
}

pub fn save(img: &RgbImage, path: &Path) -> VistaResult<PathBuf> {
    img.save(path).map_err(|source| VistaError::ImageSave {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(path.to_path_buf())
}

/// Unordered pairs `(i, j)` with `i < j`, lexicographic
pub fn image_pairs(n: usize) -> Vec<(usize, usize)> {
    (0..n)
        .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
        .collect()
}

/// `matches_<i>-<j>.jpg` with 1-based image numbers
pub fn match_output_name(i: usize, j: usize) -> String {
    format!("matches_{}-{}.jpg", i + 1, j + 1)
}

/// `<stem><suffix>.<ext>` next to `output`
pub fn annotated_name(output: &str, suffix: &str) -> String {
    let path = Path::new(output);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(output);
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext),
        None => format!("{}{}", stem, suffix),
    }
}

/// Render every pair of `match_inputs`.
///
/// Pairs are computed in parallel and written in pair order. A failed pair
/// or an unreadable input only affects the pairs involving it.
pub fn run_matching(cfg: &VistaConfig, report: &mut RunReport) {
    let matcher = FeatureMatcher::new(cfg.feature.clone(), cfg.filter, cfg.blur_sigma);

    let images: Vec<Option<RgbImage>> = cfg
        .match_inputs
        .iter()
        .map(|name| match load_rgb(&cfg.input_path(name)) {
            Ok(img) => Some(img),
            Err(e) => {
                log::error!("{}", e);
                report.failures.push(e);
                None
            }
        })
        .collect();

    let pairs = image_pairs(images.len());
    let rendered: Vec<(usize, usize, VistaResult<RgbImage>)> = pairs
        .par_iter()
        .filter_map(|&(i, j)| {
            let (a, b) = (images[i].as_ref()?, images[j].as_ref()?);
            Some((i, j, matcher.display_matches(a, b)))
        })
        .collect();

    for (i, j, result) in rendered {
        let path = cfg.output_path(&match_output_name(i, j));
        report.record(result.and_then(|img| save(&img, &path)));
    }
}

fn rectify_one(cfg: &VistaConfig, rectifier: &Rectifier, job: &RectifyJob) -> VistaResult<Vec<PathBuf>> {
    let img = load_rgb(&cfg.input_path(&job.input))?;
    let out = rectifier.rectify(&img)?;
    let mut written = vec![save(&out.rectified, &cfg.output_path(&job.output))?];
    if let Some(suffix) = &cfg.rectify.annotated_suffix {
        let name = annotated_name(&job.output, suffix);
        written.push(save(&out.annotated, &cfg.output_path(&name))?);
    }
    Ok(written)
}

/// Rectify every configured job, one after another
pub fn run_rectification(cfg: &VistaConfig, report: &mut RunReport) {
    let rectifier = match Rectifier::new(&cfg.rectify) {
        Ok(r) => r,
        Err(e) => {
            report.record(Err(e));
            return;
        }
    };

    for job in &cfg.rectify.jobs {
        match rectify_one(cfg, &rectifier, job) {
            Ok(paths) => paths.into_iter().for_each(|p| report.record(Ok(p))),
            Err(e) => report.record(Err(e)),
        }
    }
}

/// Both pipelines, matching first. Only a missing output directory that
/// cannot be created aborts the run; everything else lands in the report.
pub fn run(cfg: &VistaConfig) -> VistaResult<RunReport> {
    std::fs::create_dir_all(&cfg.output_dir).map_err(|source| VistaError::Io {
        path: cfg.output_dir.clone(),
        source,
    })?;

    let mut report = RunReport::default();
    run_matching(cfg, &mut report);
    run_rectification(cfg, &mut report);
    log::info!(
        "{} outputs written, {} failures",
        report.written.len(),
        report.failures.len()
    );
    Ok(report)
}
