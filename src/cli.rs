use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Input .grf container file
    pub input: PathBuf,
    /// Emit the decoded structure as JSON instead of a text report
    #[arg(long)]
    pub json: bool,
}
