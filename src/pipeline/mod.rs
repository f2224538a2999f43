//! Orchestration: one image or a whole split from pixels to a decision.

use anyhow::{Context, Result};
use image::{DynamicImage, RgbImage};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use rayon::prelude::*;

use crate::{
    build_labeler, combine_confidence, elapsed_module, extract_regions, load_image_rgb,
    mvtec_samples, normalize_heatmap, render_overlay, requires_review, threshold_heatmap,
    ActionPolicy, ArtifactKind, ArtifactSink, BackendCache, BoundingBox, Config, ImageDecision,
    InspectError, InspectionResult, LabelRequest, LabelResult, MeanDiff, PngArtifactSink, Report, Sample,
    SemanticLabeler, SkippedSample, Split, DEFAULT_OVERLAY_ALPHA, GOOD_LABEL,
};

/// Fraction of the raw image threshold reached, capped at 1.
///
/// A non-positive threshold yields 0.
pub fn anomaly_confidence(score: f32, image_threshold: f32) -> f32 {
    if image_threshold > 0.0 {
        (score / image_threshold).min(1.0)
    } else {
        0.0
    }
}

/// Short description of the detected regions handed to the labeler.
pub fn roi_note(boxes: &[BoundingBox]) -> String {
    match boxes.iter().max_by_key(|b| b.area()) {
        None => "no regions above min_area".to_string(),
        Some(largest) => format!(
            "{} region(s); largest {} ({} px)",
            boxes.len(),
            largest,
            largest.area()
        ),
    }
}

pub struct Pipeline {
    config: Config,
    model: MeanDiff,
    labeler: Box<dyn SemanticLabeler>,
    sink: Box<dyn ArtifactSink>,
    policy: ActionPolicy,
    progress: bool,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("category", &self.config.data.category)
            .field("fitted", &self.model.is_fitted())
            .field("labeler", &self.labeler.name())
            .finish()
    }
}

impl Pipeline {
    /// Validates `config` and wires the collaborators together.
    pub fn new(
        config: Config,
        labeler: Box<dyn SemanticLabeler>,
        sink: Box<dyn ArtifactSink>,
    ) -> Result<Self> {
        config.validate()?;
        let policy = ActionPolicy::new(config.risk.risk_to_action.clone())?;
        Ok(Self {
            config,
            model: MeanDiff::new(),
            labeler,
            sink,
            policy,
            progress: false,
        })
    }

    /// Labeler from `config` (through `cache`) and PNG artifacts under
    /// `paths.artifacts`.
    pub fn from_config(config: Config, cache: &mut BackendCache) -> Result<Self> {
        let labeler = build_labeler(&config, cache);
        let sink = Box::new(PngArtifactSink::new(&config.paths.artifacts));
        Self::new(config, labeler, sink)
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn model(&self) -> &MeanDiff {
        &self.model
    }

    pub fn labeler(&self) -> &dyn SemanticLabeler {
        self.labeler.as_ref()
    }

    pub fn fit(&mut self, images: &[RgbImage]) -> Result<()> {
        elapsed_module!("PIPELINE", "fit", self.model.fit(images)?);
        Ok(())
    }

    /// Fits on every `train/good` image of the configured category.
    ///
    /// Any unreadable training image is fatal.
    pub fn fit_from_samples(&mut self) -> Result<()> {
        let data = &self.config.data;
        let samples: Vec<Sample> = mvtec_samples(&data.root, &data.category, Split::Train)?
            .into_iter()
            .filter(Sample::is_good)
            .collect();
        if samples.is_empty() {
            return Err(InspectError::EmptyTrainingSet.into());
        }
        let images = samples
            .par_iter()
            .map(|s| load_image_rgb(&s.image_path))
            .collect::<Result<Vec<_>>>()?;
        info!(
            "Fitting reference on {} {} image(s)",
            images.len(),
            GOOD_LABEL
        );
        self.fit(&images)
    }

    /// Scores, localizes, labels and decides one image.
    pub fn inspect(&self, image_id: &str, image: &RgbImage) -> Result<InspectionResult> {
        let post = &self.config.postproc;
        let category = self.config.data.category.as_str();
        let unknown_label = self.config.labels.unknown_label.as_str();

        let (score, heatmap) = elapsed_module!("PIPELINE", "infer", self.model.infer(image)?);
        let normalized = normalize_heatmap(&heatmap, post.heatmap_normalize);
        let mask = threshold_heatmap(
            &normalized,
            post.threshold_method,
            post.threshold_value,
            post.threshold_percentile,
        );
        let bboxes = elapsed_module!("PIPELINE", "regions", extract_regions(&mask, post.min_area));

        let image_decision = ImageDecision::from_score(score, post.image_threshold);
        let anomaly_conf = anomaly_confidence(score, post.image_threshold);
        let note = roi_note(&bboxes);

        let request = LabelRequest {
            category,
            label_set: self.config.label_set(),
            unknown_label,
            roi_note: &note,
            image: Some(image),
            anomaly_score: anomaly_conf,
            bbox_count: bboxes.len(),
            mask_ratio: mask.ratio(),
        };
        let label = elapsed_module!("PIPELINE", "label", self.labeler.label(&request));
        // Result records only ever carry vocabulary labels.
        let label = if request.accepts(&label.defect_label) {
            label
        } else {
            warn!(
                "{}: labeler {} returned out-of-vocabulary label {:?}",
                image_id,
                self.labeler.name(),
                label.defect_label
            );
            LabelResult::unknown(unknown_label, label.evidence)
        };

        let unc = &self.config.uncertainty;
        let confidence = combine_confidence(anomaly_conf, label.confidence, unc.combine_method);
        let human_review_required =
            requires_review(confidence, &label.defect_label, unknown_label, unc.review_threshold);

        let risk = &self.config.risk;
        let assessment = risk
            .rpm
            .lookup_strict(risk.severity, risk.occurrence, risk.detection);
        let action = self.policy.resolve(Some(assessment.risk_class.as_str())).to_string();

        let anomaly_heatmap_path = self.sink.write_image(
            ArtifactKind::Heatmap,
            image_id,
            &DynamicImage::ImageLuma8(normalized.to_gray()),
        )?;
        let anomaly_mask_path = self.sink.write_image(
            ArtifactKind::Mask,
            image_id,
            &DynamicImage::ImageLuma8(mask.to_gray()),
        )?;
        if self.config.paths.save_overlays {
            let overlay = render_overlay(image, &normalized, &bboxes, DEFAULT_OVERLAY_ALPHA);
            self.sink
                .write_image(ArtifactKind::Overlay, image_id, &DynamicImage::ImageRgba8(overlay))?;
        }
        if self.config.paths.save_raw_heatmaps {
            self.sink.write_raw_heatmap(image_id, heatmap.map())?;
        }

        log::debug!(
            "{}: score={:.4} decision={:?} boxes={} label={} confidence={:.3}",
            image_id,
            score,
            image_decision,
            bboxes.len(),
            label.defect_label,
            confidence
        );

        Ok(InspectionResult {
            image_id: image_id.to_string(),
            category: category.to_string(),
            image_decision,
            anomaly_score: score,
            anomaly_heatmap_path,
            anomaly_mask_path,
            bboxes,
            defect_label: label.defect_label,
            evidence: label.evidence,
            risk_score: assessment.risk_score,
            risk_class: assessment.risk_class,
            action,
            confidence,
            human_review_required,
        })
    }

    pub fn inspect_sample(&self, sample: &Sample) -> Result<InspectionResult> {
        let image = load_image_rgb(&sample.image_path)?;
        self.inspect(&sample.image_id(), &image)
            .with_context(|| format!("Failed to inspect {}", sample.image_path.display()))
    }

    /// Inspects `samples` in parallel. Output keeps input order; failures
    /// land in `skipped` instead of aborting the batch.
    pub fn run_batch(&self, samples: &[Sample]) -> Result<Report> {
        let pb = if self.progress {
            let pb = ProgressBar::new(samples.len() as u64);
            pb.set_style(
                ProgressStyle::with_template(
                    "{prefix:>12} [{bar:40.cyan/blue}] {pos}/{len} ({elapsed}, eta {eta})",
                )?
                .progress_chars("=> "),
            );
            pb.set_prefix(self.config.data.category.clone());
            pb
        } else {
            ProgressBar::hidden()
        };

        let outcomes: Vec<Result<InspectionResult>> = samples
            .par_iter()
            .map(|sample| {
                let outcome = self.inspect_sample(sample);
                pb.inc(1);
                outcome
            })
            .collect();
        pb.finish_and_clear();

        let mut results = Vec::with_capacity(samples.len());
        let mut skipped = Vec::new();
        for (sample, outcome) in samples.iter().zip(outcomes) {
            match outcome {
                Ok(result) => results.push(result),
                Err(err) => {
                    warn!("Skipping {}: {err:#}", sample.image_path.display());
                    skipped.push(SkippedSample {
                        image_path: sample.image_path.to_string_lossy().into_owned(),
                        reason: format!("{err:#}"),
                    });
                }
            }
        }

        let report = Report::new(&self.config.data.category, results, skipped);
        info!(
            "{}: {} inspected, {} anomalous, {} for review, {} skipped",
            report.category,
            report.results.len(),
            report.summary.anomalous,
            report.summary.review_required,
            report.summary.skipped
        );
        Ok(report)
    }

    /// Fits on `train/good`, then inspects the whole `test` split.
    pub fn run(&mut self) -> Result<Report> {
        self.fit_from_samples()?;
        let data = &self.config.data;
        let samples = mvtec_samples(&data.root, &data.category, Split::Test)?;
        info!("Inspecting {} test sample(s)", samples.len());
        self.run_batch(&samples)
    }
}
