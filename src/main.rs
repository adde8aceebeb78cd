// src/main.rs
use anyhow::Result;
use clap::{Parser, ValueEnum};
use handsign::config::DetectionParameters;
use handsign::descriptor::DescriptorLibrary;
use handsign::library;
use handsign::matcher::Classifier;
use handsign::session::{analyze_frame, load_frames, SessionExporter};
use nalgebra::Vector3;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LibraryChoice {
    Asl,
    Gestures,
    All,
}

#[derive(Parser, Debug)]
#[command(name = "handsign", version, about = "Classify recorded hand joint frames as ASL letters and gestures")]
struct Cli {
    /// JSON file with an array of recorded frames
    frames: PathBuf,

    /// Detection parameters (JSON). Missing fields use defaults.
    #[arg(long)]
    params: Option<PathBuf>,

    /// Descriptor library to match against
    #[arg(long, value_enum, default_value_t = LibraryChoice::All)]
    library: LibraryChoice,

    /// Write classification.csv under DIR/<session> (default DIR: Documents/HandSign)
    #[arg(long, value_name = "DIR")]
    export: Option<Option<PathBuf>>,

    /// Session name (default: session_<local timestamp>)
    #[arg(long)]
    session: Option<String>,
}

fn default_output_dir() -> PathBuf {
    directories::UserDirs::new()
        .and_then(|dirs| dirs.document_dir().map(|p| p.join("HandSign")))
        .unwrap_or_else(|| PathBuf::from("./output"))
}

fn select_library(choice: LibraryChoice) -> Result<&'static DescriptorLibrary> {
    let library = match choice {
        LibraryChoice::Asl => library::asl_alphabet()?,
        LibraryChoice::Gestures => library::gestures()?,
        LibraryChoice::All => library::all()?,
    };
    Ok(library)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "handsign=info".into()),
        )
        .init();

    let params = match &cli.params {
        Some(path) => DetectionParameters::load(path)?,
        None => DetectionParameters::default(),
    };
    let library = select_library(cli.library)?;
    info!(descriptors = library.len(), library = ?cli.library, "Descriptor library ready");

    let classifier = Classifier::new(Arc::new(library.clone()), params);
    let frames = load_frames(&cli.frames)?;

    let output_dir = cli.export.clone().flatten().unwrap_or_else(default_output_dir);
    let mut exporter = SessionExporter::new(output_dir, cli.session.clone());
    let toward_viewer = Vector3::z();

    for (i, frame) in frames.iter().enumerate() {
        let analysis = analyze_frame(&classifier, frame, &toward_viewer);
        let result = &analysis.classification;

        if !result.metrics.is_active {
            warn!(frame = i, timestamp = frame.timestamp, "Hand not tracked");
        } else if !result.metrics.has_all_required_joints {
            warn!(
                frame = i,
                missing = result.metrics.missing_joints.len(),
                "Incomplete joint set, metrics use fallbacks"
            );
        }

        info!(
            frame = i,
            timestamp = frame.timestamp,
            hand = result.metrics.handedness.as_str(),
            pose = result.primary_name().unwrap_or("-"),
            confidence = result.primary_confidence(),
            gesture = analysis.gesture.as_str(),
            thumbs_up = analysis.thumbs_up.is_thumbs_up,
            "Frame classified"
        );

        exporter.add_frame(analysis);
    }

    let summary = exporter.summary();
    println!("Frames: {} ({} tracked)", summary.frames, summary.active_frames);
    for (pose, count) in &summary.poses {
        println!("  {:<12} {}", pose, count);
    }
    println!(
        "Open palm: {}  Closed fist: {}  Thumbs-up: {}",
        summary.open_palm_frames, summary.closed_fist_frames, summary.thumbs_up_frames
    );

    if cli.export.is_some() {
        let path = exporter.export_csv()?;
        println!("Exported to {}", path.display());
    }

    Ok(())
}
