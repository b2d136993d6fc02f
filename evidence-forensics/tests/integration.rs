#![cfg(unix)]

use evidence_forensics::analysis::video::VideoReport;
use evidence_forensics::analysis::{ImageVerdict, RiskLevel, VideoVerdict};
use evidence_forensics::case::report::{generate_report, verify_report, write_report};
use evidence_forensics::case::{AnalysisKind, AnalysisRecord, CaseWorkspace};
use evidence_forensics::evidence::{seal_evidence, verify_evidence, EvidenceIntake, ForensicStatus};
use evidence_forensics::forensics::verify_log_file;
use evidence_forensics::tools::{
    run_image_pipeline, run_video_analysis, FrameGrabber, TruFor, VideoGuard,
};
use evidence_forensics::ForensicsError;
use image::{Rgb, RgbImage};
use ndarray::Array2;
use ndarray_npy::NpzWriter;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_mock(dir: &Path, name: &str, script: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, script).expect("write mock");
    let mut perms = fs::metadata(&path).expect("read permissions").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("set executable");
    path
}

fn write_npz(path: &Path, key: &str, map: &Array2<f32>) {
    let mut npz = NpzWriter::new(fs::File::create(path).expect("create npz"));
    npz.add_array(key, map).expect("add array");
    npz.finish().expect("finish npz");
}

fn textured_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let v = ((x * 37 + y * 91) % 256) as u8;
        Rgb([v, 255 - v, (x * 8 % 256) as u8])
    })
}

/// Mock TruFor interpreter: copies a prepared tamper map to `<out>/<image name>.npz`.
fn mock_trufor(tools: &TempDir, fixture_npz: &Path) -> TruFor {
    let script = format!(
        r#"#!/bin/sh
set -eu
# argv: script -gpu N -in IMAGE -out DIR
[ "$2" = "-gpu" ] || {{ echo "bad args: $*" >&2; exit 2; }}
in="$5"
out="$7"
mkdir -p "$out"
cp "{}" "$out/$(basename "$in").npz"
"#,
        fixture_npz.display()
    );
    let python = write_mock(tools.path(), "trufor-python", &script);
    let project = tools.path().join("test_docker");
    fs::create_dir_all(project.join("src")).expect("project dir");
    fs::write(project.join("src").join("trufor_test.py"), "").expect("script");
    TruFor::new(python, project)
}

fn intake(title: &str) -> EvidenceIntake {
    EvidenceIntake {
        fir_number: "FIR-77/2026".to_string(),
        title: title.to_string(),
        evidence_type: "Digital media".to_string(),
        description: "Seized from suspect phone".to_string(),
        facility_name: "State FSL".to_string(),
        collection_room: "Digital Intake".to_string(),
        storage_type: "Evidence server".to_string(),
        storage_unit: Some("Rack 2".to_string()),
        storage_slot: None,
        sensitivity: Some("High".to_string()),
    }
}

#[test]
fn test_seal_analyze_and_report_image() {
    let work = tempfile::tempdir().expect("work dir");
    let tools = tempfile::tempdir().expect("tools dir");

    let photo = work.path().join("suspect photo.png");
    textured_image(32, 24).save(&photo).expect("write photo");

    // Right three quarters fully tampered
    let map = Array2::from_shape_fn((8, 8), |(_, c)| if c >= 2 { 1.0f32 } else { 0.0 });
    let fixture = tools.path().join("fixture.npz");
    write_npz(&fixture, "map", &map);
    let trufor = mock_trufor(&tools, &fixture);

    let mut ws = CaseWorkspace::open("fir-77", work.path().join("cases")).expect("open case");
    let record = seal_evidence(&mut ws, &photo, intake("Suspect photo"), "si.rao").expect("seal");
    assert!(record.stored_filename.ends_with("_suspect_photo.png"));

    let analysis =
        run_image_pipeline(&trufor, &record.file_path, &ws.dirs.trufor_output).expect("pipeline");
    assert!(analysis.heatmap.exists());
    assert!(analysis.overlay.exists());
    assert!((analysis.score - 0.75).abs() < 0.01, "score {}", analysis.score);
    assert_eq!(analysis.verdict, ImageVerdict::Tampered);
    assert_eq!(analysis.risk, RiskLevel::High);
    assert_eq!(analysis.exif, vec!["Missing EXIF metadata".to_string()]);

    let json = serde_json::to_value(&analysis).expect("serialize");
    for key in ["heatmap", "overlay", "score", "verdict", "risk", "metrics", "exif"] {
        assert!(json.get(key).is_some(), "missing {}", key);
    }

    ws.record_analysis(AnalysisRecord {
        seal_id: record.seal_id.clone(),
        kind: AnalysisKind::Image,
        verdict: analysis.verdict.to_string(),
        risk: analysis.risk,
        score: Some(analysis.score),
        artifacts: vec![analysis.heatmap.clone(), analysis.overlay.clone()],
        analyzed_by: "analyst.k".to_string(),
        analyzed_at: chrono::Utc::now(),
    })
    .expect("record analysis");

    let stored = ws.case.find_evidence(&record.seal_id).expect("record");
    assert_eq!(stored.forensic_status, ForensicStatus::Analyzed);
    assert!(verify_evidence(stored).expect("verify"));
    assert!(verify_log_file(&ws.dirs.custody_log()).expect("verify log"));
    assert_eq!(ws.custody.len(), 2);

    let text = generate_report(&ws.case, Some(ws.custody.final_hash()), None);
    write_report(&ws.dirs.report, &text).expect("write report");
    let report = fs::read_to_string(&ws.dirs.report).expect("read report");
    assert!(report.contains(&record.seal_id));
    assert!(report.contains("Image: Tampered (High risk)"));
    assert!(report.contains(ws.custody.final_hash()));
    assert!(verify_report(&ws.dirs.report).expect("verify report"));
}

#[test]
fn test_trufor_failure_surfaces_stderr() {
    let tools = tempfile::tempdir().expect("tools dir");
    let python = write_mock(
        tools.path(),
        "python",
        "#!/bin/sh\necho 'RuntimeError: weights missing' >&2\nexit 1\n",
    );
    let project = tools.path().join("test_docker");
    fs::create_dir_all(&project).expect("project dir");

    let image = tools.path().join("a.png");
    textured_image(4, 4).save(&image).expect("image");

    let err = TruFor::new(python, &project)
        .run(&image, &tools.path().join("out"))
        .unwrap_err();
    match err {
        ForensicsError::ToolFailed { tool, status, stderr } => {
            assert_eq!(tool, "TruFor");
            assert_eq!(status, 1);
            assert!(stderr.contains("weights missing"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unknown_tamper_map_key_lists_keys() {
    let tools = tempfile::tempdir().expect("tools dir");
    let fixture = tools.path().join("fixture.npz");
    write_npz(&fixture, "conf", &Array2::zeros((2, 2)));
    let trufor = mock_trufor(&tools, &fixture);

    let image = tools.path().join("b.png");
    textured_image(4, 4).save(&image).expect("image");

    let err = run_image_pipeline(&trufor, &image, &tools.path().join("out")).unwrap_err();
    match err {
        ForensicsError::MissingTamperMap { keys } => assert_eq!(keys, vec!["conf".to_string()]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_video_analysis_with_mock_tools() {
    let work = tempfile::tempdir().expect("work dir");
    let tools = tempfile::tempdir().expect("tools dir");

    let video = work.path().join("clip.mp4");
    fs::write(&video, b"fake video bytes").expect("video");

    let frame_fixture = tools.path().join("frame.jpg");
    textured_image(16, 12).save(&frame_fixture).expect("frame fixture");

    let fvg_python = write_mock(
        tools.path(),
        "fvg-python",
        r#"#!/bin/sh
set -eu
[ "$2" = "--preset" ] && [ "$4" = "--extract" ] || { echo "bad args: $*" >&2; exit 2; }
cat <<'JSON'
{"video": "clip.mp4", "preset": "fast",
 "features": {"fractal_dim_box_mean": NaN, "ringing_mean": 5.2, "blockiness_mean": 0.4}}
JSON
"#,
    );
    let fvg_script = tools.path().join("fractalvideoguard.py");
    fs::write(&fvg_script, "").expect("script");

    let ffprobe = write_mock(tools.path(), "ffprobe", "#!/bin/sh\necho 12\n");
    let ffmpeg = write_mock(
        tools.path(),
        "ffmpeg",
        &format!(
            "#!/bin/sh\nfor last; do :; done\ncp \"{}\" \"$last\"\n",
            frame_fixture.display()
        ),
    );

    let guard = VideoGuard::new(&fvg_python, &fvg_script);
    let grabber = FrameGrabber::new(&ffprobe, &ffmpeg);
    let output_json = work.path().join("video_output").join("clip").join("analysis.json");

    let data =
        run_video_analysis(&guard, &grabber, &video, &output_json, 6).expect("video analysis");

    assert_eq!(data.frames.len(), 6);
    assert_eq!(data.heatmaps.len(), 6);
    assert_eq!(data.frames[5], "frame_5.jpg");
    assert_eq!(data.heatmaps[0], "heatmap_0.jpg");
    let out_dir = output_json.parent().expect("parent");
    assert!(out_dir.join("frames").join("frame_0.jpg").exists());
    assert!(out_dir.join("heatmaps").join("heatmap_5.jpg").exists());

    // (0.4 * 10 + 5.2) / 5 = 1.84
    assert_eq!(data.timeline.len(), 6);
    assert!(data.timeline.iter().all(|p| (p.risk - 1.84).abs() < 1e-9));

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output_json).expect("read json"))
            .expect("parse json");
    assert!(written["features"]["fractal_dim_box_mean"].is_null());
    assert_eq!(written["video"], serde_json::json!("clip.mp4"));
    assert_eq!(written["frames"].as_array().map(|a| a.len()), Some(6));
    assert_eq!(written["timeline"][3]["frame"], serde_json::json!(3));

    let report = VideoReport::from_data(&data);
    assert_eq!(report.verdict, VideoVerdict::LikelyManipulated);
    assert_eq!(report.risk, RiskLevel::High);
    assert_eq!(report.reason.len(), 2);
}

#[test]
fn test_video_analysis_without_frames() {
    let work = tempfile::tempdir().expect("work dir");
    let tools = tempfile::tempdir().expect("tools dir");

    let video = work.path().join("empty.mp4");
    fs::write(&video, b"").expect("video");

    let fvg_python = write_mock(
        tools.path(),
        "fvg-python",
        r#"#!/bin/sh
echo '{"features": {"fractal_dim_box_mean": 1.62, "ringing_mean": 1.1}}'
"#,
    );
    let fvg_script = tools.path().join("fvg.py");
    fs::write(&fvg_script, "").expect("script");
    let ffprobe = write_mock(tools.path(), "ffprobe", "#!/bin/sh\necho 0\n");
    let ffmpeg = write_mock(tools.path(), "ffmpeg", "#!/bin/sh\nexit 1\n");

    let output_json = work.path().join("out").join("analysis.json");
    let data = run_video_analysis(
        &VideoGuard::new(&fvg_python, &fvg_script),
        &FrameGrabber::new(&ffprobe, &ffmpeg),
        &video,
        &output_json,
        6,
    )
    .expect("video analysis");

    assert!(data.frames.is_empty());
    assert!(data.heatmaps.is_empty());
    assert!(data.timeline.is_empty());
    assert!(output_json.exists());
    assert_eq!(VideoReport::from_data(&data).verdict, VideoVerdict::LikelyAuthentic);
}

#[test]
fn test_video_analysis_with_unreadable_container() {
    let work = tempfile::tempdir().expect("work dir");
    let tools = tempfile::tempdir().expect("tools dir");

    let video = work.path().join("broken.avi");
    fs::write(&video, b"not a container").expect("video");

    let fvg_python = write_mock(
        tools.path(),
        "fvg-python",
        r#"#!/bin/sh
echo '{"features": {"fractal_dim_box_mean": 1.3, "ringing_mean": 2.0}}'
"#,
    );
    let fvg_script = tools.path().join("fvg.py");
    fs::write(&fvg_script, "").expect("script");
    let ffprobe = write_mock(
        tools.path(),
        "ffprobe",
        "#!/bin/sh\necho 'broken.avi: Invalid data found when processing input' >&2\nexit 1\n",
    );
    let ffmpeg = write_mock(tools.path(), "ffmpeg", "#!/bin/sh\nexit 1\n");

    let output_json = work.path().join("out").join("analysis.json");
    let data = run_video_analysis(
        &VideoGuard::new(&fvg_python, &fvg_script),
        &FrameGrabber::new(&ffprobe, &ffmpeg),
        &video,
        &output_json,
        6,
    )
    .expect("analysis survives a failed frame probe");

    assert!(data.frames.is_empty());
    assert!(data.timeline.is_empty());
    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output_json).expect("read json"))
            .expect("parse json");
    assert_eq!(written["frames"], serde_json::json!([]));
    assert_eq!(VideoReport::from_data(&data).verdict, VideoVerdict::Suspicious);
}

#[test]
fn test_video_analysis_missing_video() {
    let tools = tempfile::tempdir().expect("tools dir");
    let fvg_python = write_mock(tools.path(), "fvg-python", "#!/bin/sh\nexit 0\n");
    let fvg_script = tools.path().join("fvg.py");
    fs::write(&fvg_script, "").expect("script");

    let err = run_video_analysis(
        &VideoGuard::new(&fvg_python, &fvg_script),
        &FrameGrabber::new("ffprobe", "ffmpeg"),
        &tools.path().join("missing.mp4"),
        &tools.path().join("out").join("analysis.json"),
        6,
    )
    .unwrap_err();
    assert!(matches!(err, ForensicsError::EvidenceMissing(_)));
}
