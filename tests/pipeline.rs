use std::path::Path;

use image::{Rgb, RgbImage};
use vinspect::{
    write_report, BackendCache, Config, HeuristicLabeler, ImageDecision, Pipeline,
    PngArtifactSink, Report, REVIEW_REQUIRED,
};

fn good(i: u32) -> RgbImage {
    RgbImage::from_fn(24, 24, |x, y| {
        let v = (120 + (x + 2 * y) % 4 + i % 2) as u8;
        Rgb([v, v, v])
    })
}

fn deviant() -> RgbImage {
    let mut img = good(0);
    for y in 10..16 {
        for x in 5..11 {
            img.put_pixel(x, y, Rgb([30, 200, 40]));
        }
    }
    img
}

fn save(img: &RgbImage, path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    img.save(path).unwrap();
}

/// `root/tile/{train,test}` with four good training images, one good and one
/// deviant test image, and one corrupt test file.
fn dataset(root: &Path) {
    for i in 0..4 {
        save(&good(i), &root.join(format!("tile/train/good/{i:03}.png")));
    }
    save(&good(0), &root.join("tile/test/good/000.png"));
    save(&deviant(), &root.join("tile/test/crack/000.png"));
    std::fs::write(root.join("tile/test/crack/001.png"), b"definitely not a png").unwrap();
}

fn config(root: &Path, vocabulary: &[&str]) -> Config {
    let json = serde_json::json!({
        "data": { "root": root.join("data"), "category": "tile" },
        "paths": {
            "artifacts": root.join("artifacts"),
            "outputs": root.join("out"),
            "results_json": "results.json"
        },
        "postproc": { "min_area": 8, "image_threshold": 3.0 },
        "labels": { "labels": { "tile": vocabulary } },
        "risk": {
            "rpm": [
                { "severity": 6, "occurrence": 3, "detection": 2, "risk_score": 36, "risk_class": "MEDIUM" }
            ],
            "risk_to_action": { "MEDIUM": "REWORK", "REVIEW_REQUIRED": "HOLD_FOR_REVIEW" }
        },
        "uncertainty": { "combine_method": "min", "review_threshold": 0.6 }
    });
    Config::from_json_str(&json.to_string()).unwrap()
}

fn run(cfg: Config) -> Report {
    let mut cache = BackendCache::new();
    let mut pipeline = Pipeline::from_config(cfg, &mut cache).unwrap();
    pipeline.run().unwrap()
}

#[test]
fn deviant_square_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    dataset(&dir.path().join("data"));
    let report = run(config(dir.path(), &["crack", "glue_strip"]));

    assert_eq!(report.category, "tile");
    assert_eq!(report.summary.total, 3);
    assert_eq!(report.summary.skipped, 1);
    assert!(report.skipped[0].image_path.ends_with("001.png"));

    let ids: Vec<_> = report.results.iter().map(|r| r.image_id.as_str()).collect();
    assert_eq!(ids, vec!["crack_000", "good_000"]);

    let defect = &report.results[0];
    assert_eq!(defect.image_decision, ImageDecision::Anomalous);
    assert_eq!(defect.bboxes.len(), 1);
    let b = defect.bboxes[0];
    assert!(b.x_min <= 5 && b.y_min <= 10 && b.x_max >= 11 && b.y_max >= 16);
    assert_eq!(defect.defect_label, "crack");
    assert!(!defect.human_review_required);
    assert_eq!(defect.risk_class, REVIEW_REQUIRED);
    assert_eq!(defect.action, "HOLD_FOR_REVIEW");
    assert!(Path::new(&defect.anomaly_heatmap_path).is_file());
    assert!(Path::new(&defect.anomaly_mask_path).is_file());

    let normal = &report.results[1];
    assert_eq!(normal.image_decision, ImageDecision::Normal);
    assert!(normal.bboxes.is_empty());
}

#[test]
fn unknown_label_requires_review() {
    let dir = tempfile::tempdir().unwrap();
    dataset(&dir.path().join("data"));
    let report = run(config(dir.path(), &[]));

    let defect = &report.results[0];
    assert_eq!(defect.image_decision, ImageDecision::Anomalous);
    assert_eq!(defect.defect_label, "UNKNOWN");
    assert_eq!(defect.confidence, 0.0);
    assert!(defect.human_review_required);
    assert_eq!(report.summary.review_required, 2);
}

#[test]
fn configured_risk_and_report_file() {
    let dir = tempfile::tempdir().unwrap();
    dataset(&dir.path().join("data"));
    let mut cfg = config(dir.path(), &["crack"]);
    cfg.risk.severity = Some(6);
    cfg.risk.occurrence = Some(3);
    cfg.risk.detection = Some(2);
    let results_path = cfg.paths.results_path();

    let sink = Box::new(PngArtifactSink::new(&cfg.paths.artifacts));
    let mut pipeline = Pipeline::new(cfg, Box::new(HeuristicLabeler), sink).unwrap();
    let report = pipeline.run().unwrap();
    for r in &report.results {
        assert_eq!(r.risk_class, "MEDIUM");
        assert_eq!(r.risk_score, Some(36));
        assert_eq!(r.action, "REWORK");
    }

    write_report(&results_path, &report).unwrap();
    let back: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&results_path).unwrap()).unwrap();
    assert_eq!(back["results"].as_array().unwrap().len(), 2);
    assert_eq!(back["results"][0]["image_decision"], "anomalous");
    assert_eq!(back["summary"]["skipped"], 1);
}

#[test]
fn missing_training_split_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut cache = BackendCache::new();
    let mut pipeline = Pipeline::from_config(config(dir.path(), &["crack"]), &mut cache).unwrap();
    assert!(pipeline.run().is_err());
}

#[test]
fn shipped_config_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("configs/mvtec_bottle.json");
    let cfg = Config::from_json_file(&path).unwrap();
    assert_eq!(cfg.data.category, "bottle");
    assert_eq!(cfg.label_set().len(), 3);
    assert_eq!(cfg.risk.rpm.len(), 3);
    assert!(cfg.vlm.as_ref().is_some_and(|v| !v.enabled));
}
