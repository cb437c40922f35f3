use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Manage playlists for a local music library", long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub action: Action,
    #[arg(long, global = true)]
    /// Config file (defaults to the platform config dir)
    pub config: Option<PathBuf>,
    #[arg(long, global = true)]
    /// Data directory holding playlists and the library snapshot
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Action {
    #[command(about = "List all playlists")]
    List,
    #[command(about = "Show one playlist and its tracks")]
    Show {
        /// Playlist id or name
        playlist: String,
    },
    #[command(about = "Create a virtual playlist")]
    Create {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    #[command(about = "Rename a virtual playlist")]
    Rename {
        /// Playlist id or name
        playlist: String,
        name: String,
    },
    #[command(about = "Set or clear a playlist description")]
    Describe {
        /// Playlist id or name
        playlist: String,
        /// New description. Omit to clear it.
        text: Option<String>,
    },
    #[command(about = "Delete a virtual or folder playlist")]
    Delete {
        /// Playlist id or name
        playlist: String,
    },
    #[command(about = "Add a library track to a virtual playlist")]
    Add {
        /// Track id or title
        track: String,
        /// Playlist id or name
        playlist: String,
    },
    #[command(about = "Remove a track from a virtual playlist")]
    Remove {
        /// Track id or title
        track: String,
        /// Playlist id or name
        playlist: String,
    },
    #[command(about = "Drop a track onto any playlist, as a drag-and-drop would")]
    Drop {
        /// Track id or title
        track: String,
        /// Playlist id or name
        playlist: String,
    },
    #[command(about = "Scan a directory and add its tracks to the library")]
    Import { dir: PathBuf },
    #[command(about = "Create a folder playlist from a directory")]
    Folder {
        dir: PathBuf,
        #[arg(short, long)]
        /// Playlist name (defaults to the directory name)
        name: Option<String>,
    },
    #[command(about = "Rescan a folder playlist")]
    Rescan {
        /// Playlist id or name
        playlist: String,
    },
    #[command(about = "Remove references to tracks missing from the library")]
    Cleanup,
    #[command(about = "Play a playlist")]
    Play {
        /// Playlist id or name
        playlist: String,
        #[arg(short, long, default_value_t = 0)]
        /// Zero-based position to start from
        start: usize,
    },
    #[command(about = "List library tracks")]
    Tracks,
    #[command(about = "Write the current settings to the config file")]
    Init {
        #[arg(short, long)]
        /// Replace an existing config file
        force: bool,
    },
}
