use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Input .map / Tiled .json file, or a directory of .map files
    pub input: PathBuf,
    /// Output directory
    pub output: PathBuf,

    /// Object template directory; searched before the defaults
    #[arg(long = "objects", value_name = "DIR", env = "APP_OBJECT_DIRECTORIES", value_delimiter = ',')]
    pub objects: Vec<PathBuf>,

    /// Only tiles declared by the map itself are available
    #[arg(long)]
    pub no_base_tiles: bool,

    /// Run an interaction on this object and print the outcome
    #[arg(long, value_name = "OBJECT_ID")]
    pub interact: Option<String>,

    /// Player name used by --interact
    #[arg(long, requires = "interact")]
    pub player: Option<String>,

    /// Action name used by --interact
    #[arg(long, default_value = "interact", requires = "interact")]
    pub action: String,
}
