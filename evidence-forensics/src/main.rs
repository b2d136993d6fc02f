//! evidence-forensics: chain-of-custody and tamper analysis CLI
//!
//! Seals evidence files into a case, records their movements, runs the
//! image and video tamper detectors and writes integrity-protected reports.
//! Analysis results go to stdout as JSON; logs go to stderr.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use evidence_forensics::analysis::forgery::analyze_tamper_map;
use evidence_forensics::analysis::video::VideoReport;
use evidence_forensics::case::report::{
    examiner_from_env, generate_report, write_report, write_report_xlsx, ReportMetadata,
};
use evidence_forensics::case::{latest_case_name, AnalysisKind, AnalysisRecord, CaseWorkspace};
use evidence_forensics::config::ForensicsConfig;
use evidence_forensics::evidence::{
    export_register, list_evidence_files, record_movement, seal_evidence, verify_evidence,
    EvidenceIntake, ForensicStatus, MediaKind,
};
use evidence_forensics::tools::{
    run_image_pipeline, run_video_analysis, FrameGrabber, TruFor, VideoGuard,
};

#[derive(Parser, Debug)]
#[command(
    name = "evidence-forensics",
    version,
    about = "Digital evidence custody and tamper analysis"
)]
struct Cli {
    /// Directory holding case folders
    #[arg(long, short = 'o', env = "EVIDENCE_OUTPUT_DIR", default_value = "cases", global = true)]
    output_dir: PathBuf,

    /// Case name (folder name). Without it, `seal` starts a new
    /// case-YYYYMMDD-HHMMSS case and other commands reopen the latest case
    #[arg(long, short = 'c', env = "EVIDENCE_CASE", global = true)]
    case: Option<String>,

    /// Tool configuration file (JSON)
    #[arg(long, env = "EVIDENCE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Name recorded in the custody log. Defaults to the OS user
    #[arg(long, env = "EVIDENCE_ACTOR", global = true)]
    actor: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Copy a file into the case evidence store and seal it
    Seal(SealArgs),
    /// Record a physical movement of sealed evidence
    Move {
        /// Seal ID or stored file name
        evidence: String,
        #[arg(long)]
        to: String,
        /// Defaults to the current recorded location
        #[arg(long)]
        from: Option<String>,
        #[arg(long, default_value = "")]
        reason: String,
    },
    /// List the evidence register, or media files in the evidence store
    List {
        /// List stored files of this kind instead of register entries
        #[arg(long, value_enum)]
        kind: Option<KindArg>,
        /// Only evidence still awaiting analysis
        #[arg(long, default_value_t = false)]
        pending: bool,
        /// Also export the register to CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Run the image forgery localizer on sealed evidence (or an image path)
    Image {
        evidence: String,
        /// GPU index for the model, -1 for CPU
        #[arg(long)]
        gpu: Option<i32>,
    },
    /// Score an existing tamper map archive against its image
    Render {
        #[arg(long)]
        npz: PathBuf,
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        out: PathBuf,
        /// Artifact base name. Defaults to the image file stem
        #[arg(long)]
        base: Option<String>,
    },
    /// Run the video authenticity analyzer on sealed evidence (or a video path)
    Video {
        evidence: String,
        #[arg(long)]
        preset: Option<String>,
        /// Number of frames to sample
        #[arg(long)]
        frames: Option<usize>,
    },
    /// Re-hash sealed evidence and check the custody log chain
    Verify {
        /// Seal ID or stored file name. Defaults to all evidence
        evidence: Option<String>,
    },
    /// Write the case report (text with self-hash, optional XLSX/CSV)
    Report {
        #[arg(long, default_value_t = false)]
        xlsx: bool,
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct SealArgs {
    file: PathBuf,
    #[arg(long)]
    fir: String,
    #[arg(long)]
    title: String,
    #[arg(long = "type")]
    evidence_type: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long)]
    facility: String,
    #[arg(long)]
    room: String,
    #[arg(long)]
    storage_type: String,
    #[arg(long)]
    unit: Option<String>,
    #[arg(long)]
    slot: Option<String>,
    #[arg(long)]
    sensitivity: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Image,
    Video,
}

impl From<KindArg> for MediaKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Image => MediaKind::Image,
            KindArg::Video => MediaKind::Video,
        }
    }
}

fn main() -> Result<()> {
    // Logs to stderr so stdout stays clean for JSON results
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let actor = cli
        .actor
        .clone()
        .or_else(examiner_from_env)
        .unwrap_or_else(|| "unknown".to_string());

    match cli.command {
        Command::Render { npz, image, out, base } => {
            let base = base.unwrap_or_else(|| file_stem(&image));
            let analysis = analyze_tamper_map(&npz, &image, &out, &base)?;
            println!("{}", serde_json::to_string_pretty(&analysis)?);
            Ok(())
        }
        command => {
            let name = select_case(cli.case.as_deref(), &command, &cli.output_dir)?;
            let mut ws = CaseWorkspace::open(name, cli.output_dir.clone())?;
            tracing::debug!("Case {} at {:?}", ws.case.case_id(), ws.dirs.base);
            run_case_command(command, &mut ws, cli.config.as_deref(), &actor)
        }
    }
}

fn run_case_command(
    command: Command,
    ws: &mut CaseWorkspace,
    config_path: Option<&Path>,
    actor: &str,
) -> Result<()> {
    match command {
        Command::Seal(args) => {
            let intake = EvidenceIntake {
                fir_number: args.fir,
                title: args.title,
                evidence_type: args.evidence_type,
                description: args.description,
                facility_name: args.facility,
                collection_room: args.room,
                storage_type: args.storage_type,
                storage_unit: args.unit,
                storage_slot: args.slot,
                sensitivity: args.sensitivity,
            };
            let record = seal_evidence(ws, &args.file, intake, actor)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Move { evidence, to, from, reason } => {
            let movement = record_movement(ws, &evidence, from.as_deref(), &to, &reason, actor)?;
            println!(
                "Moved {}: {} -> {}",
                evidence, movement.from_location, movement.to_location
            );
        }
        Command::List { kind, pending, csv } => {
            if let Some(kind) = kind {
                for name in list_evidence_files(&ws.dirs.evidence, kind.into())? {
                    println!("{}", name);
                }
            } else {
                for e in ws
                    .case
                    .evidence
                    .iter()
                    .filter(|e| !pending || e.forensic_status == ForensicStatus::Pending)
                {
                    println!(
                        "{}\t{}\t{}\t{}\t{}",
                        e.seal_id,
                        e.fir_number,
                        e.evidence_type,
                        e.forensic_status,
                        e.stored_filename
                    );
                }
            }
            if let Some(path) = csv {
                export_register(&ws.case.evidence, &path)?;
                tracing::info!("Register exported to {:?}", path);
            }
        }
        Command::Image { evidence, gpu } => {
            let config = ForensicsConfig::load(config_path)?;
            let mut trufor = TruFor::from_config(&config);
            if let Some(gpu) = gpu {
                trufor = trufor.with_gpu(gpu);
            }

            let (path, seal_id) = resolve_evidence(ws, &evidence)?;
            let analysis = run_image_pipeline(&trufor, &path, &ws.dirs.trufor_output)?;
            println!("{}", serde_json::to_string_pretty(&analysis)?);

            if let Some(seal_id) = seal_id {
                ws.record_analysis(AnalysisRecord {
                    seal_id,
                    kind: AnalysisKind::Image,
                    verdict: analysis.verdict.to_string(),
                    risk: analysis.risk,
                    score: Some(analysis.score),
                    artifacts: vec![analysis.heatmap.clone(), analysis.overlay.clone()],
                    analyzed_by: actor.to_string(),
                    analyzed_at: Utc::now(),
                })?;
            }
        }
        Command::Video { evidence, preset, frames } => {
            let config = ForensicsConfig::load(config_path)?;
            let mut guard = VideoGuard::from_config(&config);
            if let Some(preset) = preset {
                guard = guard.with_preset(preset);
            }
            let grabber = FrameGrabber::from_config(&config);

            let (path, seal_id) = resolve_evidence(ws, &evidence)?;
            let out_dir = ws
                .dirs
                .video_dir(seal_id.as_deref().unwrap_or(&file_stem(&path)));
            let output_json = out_dir.join("analysis.json");

            let data = run_video_analysis(
                &guard,
                &grabber,
                &path,
                &output_json,
                frames.unwrap_or(config.frame_samples),
            )?;
            let report = VideoReport::from_data(&data);
            println!("{}", serde_json::to_string_pretty(&report)?);

            if let Some(seal_id) = seal_id {
                ws.record_analysis(AnalysisRecord {
                    seal_id,
                    kind: AnalysisKind::Video,
                    verdict: report.verdict.to_string(),
                    risk: report.risk,
                    score: None,
                    artifacts: vec![output_json],
                    analyzed_by: actor.to_string(),
                    analyzed_at: Utc::now(),
                })?;
            }
        }
        Command::Verify { evidence } => {
            let records: Vec<_> = match evidence {
                Some(key) => vec![ws
                    .case
                    .find_evidence(&key)
                    .with_context(|| format!("Unknown evidence: {}", key))?
                    .clone()],
                None => ws.case.evidence.clone(),
            };

            let mut failures = 0;
            for record in &records {
                let ok = match verify_evidence(record) {
                    Ok(ok) => ok,
                    Err(e) => {
                        tracing::warn!("{:#}", e);
                        false
                    }
                };
                if !ok {
                    failures += 1;
                }
                println!("{}\t{}", record.seal_id, if ok { "OK" } else { "MISMATCH" });
                ws.custody.record(
                    actor,
                    format!(
                        "Evidence Verified | SealID {} | {}",
                        record.seal_id,
                        if ok { "OK" } else { "MISMATCH" }
                    ),
                )?;
            }

            let chain_ok = ws.custody.verify()?;
            println!("custody-log\t{}", if chain_ok { "OK" } else { "BROKEN" });
            if failures > 0 || !chain_ok {
                bail!(
                    "Integrity check failed ({} evidence mismatches, custody chain {})",
                    failures,
                    if chain_ok { "intact" } else { "broken" }
                );
            }
        }
        Command::Report { xlsx, csv } => {
            ws.custody.record(actor, "Report Generated")?;
            let metadata = ReportMetadata::from_environment();
            let log_hash = ws.custody.final_hash().to_string();

            let text = generate_report(&ws.case, Some(&log_hash), Some(&metadata));
            write_report(&ws.dirs.report, &text)?;
            println!("{}", ws.dirs.report.display());

            if xlsx {
                let path = ws.dirs.report.with_extension("xlsx");
                write_report_xlsx(&path, &ws.case, Some(&log_hash), Some(&metadata))?;
                println!("{}", path.display());
            }
            if let Some(path) = csv {
                export_register(&ws.case.evidence, &path)?;
                println!("{}", path.display());
            }
        }
        Command::Render { .. } => bail!("render does not operate on a case"),
    }
    Ok(())
}

/// Case to open: the named one, a fresh one for `seal`, else the latest.
fn select_case(requested: Option<&str>, command: &Command, output_dir: &Path) -> Result<String> {
    if let Some(name) = requested.filter(|n| !n.trim().is_empty()) {
        return Ok(name.to_string());
    }
    if matches!(command, Command::Seal(_)) {
        // Empty name makes a new timestamped case
        return Ok(String::new());
    }
    let latest = latest_case_name(output_dir)?.with_context(|| {
        format!("No case found under {:?}; pass --case or seal evidence first", output_dir)
    })?;
    tracing::info!("Using latest case {}", latest);
    Ok(latest)
}

/// Sealed evidence by seal ID or stored name, else an existing file path.
fn resolve_evidence(ws: &CaseWorkspace, key: &str) -> Result<(PathBuf, Option<String>)> {
    if let Some(record) = ws.case.find_evidence(key) {
        return Ok((record.file_path.clone(), Some(record.seal_id.clone())));
    }
    let stored = ws.dirs.evidence.join(key);
    if stored.is_file() {
        return Ok((stored, None));
    }
    let path = PathBuf::from(key);
    if path.is_file() {
        tracing::warn!("{:?} is not sealed in this case; result will not be recorded", path);
        return Ok((path, None));
    }
    bail!("Unknown evidence: {}", key)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "evidence".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use evidence_forensics::case::Case;

    fn list() -> Command {
        Command::List {
            kind: None,
            pending: false,
            csv: None,
        }
    }

    #[test]
    fn test_select_case_reuses_latest() {
        let dir = tempfile::tempdir().unwrap();
        assert!(select_case(None, &list(), dir.path()).is_err());

        Case::new("fir-9", dir.path().to_path_buf()).unwrap().save().unwrap();
        assert_eq!(select_case(None, &list(), dir.path()).unwrap(), "fir-9");
        assert_eq!(select_case(Some("other"), &list(), dir.path()).unwrap(), "other");
    }

    #[test]
    fn test_select_case_seal_starts_new_case() {
        let dir = tempfile::tempdir().unwrap();
        Case::new("fir-9", dir.path().to_path_buf()).unwrap().save().unwrap();
        let args = "evidence-forensics seal a.png --fir F1 --title t --type img \
                    --facility lab --room r1 --storage-type digital";
        let seal = Cli::parse_from(args.split_whitespace());
        assert_eq!(select_case(seal.case.as_deref(), &seal.command, dir.path()).unwrap(), "");
    }
}
