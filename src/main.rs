use clap::Parser;
use std::path::PathBuf;
use std::process;

use panotour::{HotspotConfig, TourConfig};

#[derive(Parser)]
#[command(name = "panotour")]
#[command(about = "Walk through a tour of 360° panoramas", long_about = None)]
#[command(version)]
struct Cli {
    /// Tour description (JSON)
    tour: PathBuf,

    /// Directory holding the `<scene>.jpg` panoramas, overriding the tour's own
    #[arg(short, long)]
    images: Option<PathBuf>,

    /// Image to draw on hotspot markers
    #[arg(long)]
    marker: Option<PathBuf>,

    /// Window width in logical pixels
    #[arg(long, default_value = "1280")]
    width: u32,

    /// Window height in logical pixels
    #[arg(long, default_value = "720")]
    height: u32,

    /// Also make markers outside the central screen band unclickable
    #[arg(long)]
    strict_hotspots: bool,
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let mut config = TourConfig::new()
        .size(cli.width, cli.height)
        .hotspots(HotspotConfig::default().exclude_hidden_from_hit_test(cli.strict_hotspots));
    if let Some(images) = cli.images {
        config = config.image_directory(images);
    }
    if let Some(marker) = cli.marker {
        config = config.marker_image(marker);
    }

    if let Err(e) = panotour::run_with_config(&cli.tour, config) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
