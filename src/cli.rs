use camino::Utf8PathBuf;

#[derive(clap::Parser)]
#[clap(name = "musify", about = "Synchronise a local music library with a remote streaming service")]
pub(crate) struct Cli {
    #[clap(subcommand)]
    pub(crate) command: Commands,
}

#[derive(clap::Subcommand)]
pub(crate) enum Commands {
    /// Scan the library and report its tracks and playlists
    Scan(LibraryArgs),
    /// Re-evaluate playlists against the library and write them back
    Playlists(PlaylistsArgs),
}

#[derive(clap::Args)]
pub(crate) struct LibraryArgs {
    /// Folder containing the music files
    pub(crate) music_dir: Utf8PathBuf,
    /// Folder containing playlist files, defaults to <music_dir>/playlists
    #[clap(long)]
    pub(crate) playlist_dir: Option<Utf8PathBuf>,
}

#[derive(clap::Args)]
pub(crate) struct PlaylistsArgs {
    #[clap(flatten)]
    pub(crate) library: LibraryArgs,
    /// Report what would change without writing any files
    #[clap(long)]
    pub(crate) dry_run: bool,
}
