use clap::Parser;
use color_eyre::Result;
use musify::local::library::LocalLibrary;
use musify::progress::BarProgress;

use crate::cli::{Cli, Commands};

mod cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install().unwrap();
    setup_tracing();

    let options = Cli::parse();

    match options.command {
        Commands::Scan(args) => {
            let mut library = LocalLibrary::new(args.music_dir, args.playlist_dir);
            library
                .load(true, true, &BarProgress::new("Scanning"))
                .await?;
            library.log_library();
        }
        Commands::Playlists(args) => {
            let mut library = LocalLibrary::new(args.library.music_dir, args.library.playlist_dir);
            library
                .load(true, true, &BarProgress::new("Scanning"))
                .await?;
            library.save_playlists(args.dry_run)?;
        }
    };

    Ok(())
}

fn setup_tracing() {
    use tracing_subscriber::filter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = filter::EnvFilter::builder()
        .with_default_directive(filter::LevelFilter::INFO.into())
        .from_env_lossy();
    let fmt = fmt::layer().pretty().with_line_number(true);

    let _ignore_err = tracing_subscriber::registry()
        .with(fmt)
        .with(filter)
        .try_init();
}
