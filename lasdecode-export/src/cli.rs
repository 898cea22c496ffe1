use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Decoder for uncompressed LAS point cloud files.
#[derive(Debug, Parser)]
pub struct AppOptions {
    /// Verbosity of the command line output.
    #[clap(long, default_value = "info", global = true)]
    pub log_level: log::Level,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Converts a las file to a text file with one `X,Y,Z,R,G,B` row per point.
    ///
    /// Coordinates are scaled to world coordinates and rounded to 3 decimals,
    /// colors are reduced to 8 bit.
    Txt(TxtOptions),

    /// Prints the header and the variable length records of a las file as json.
    Info(InfoOptions),
}

#[derive(Debug, Parser)]
pub struct TxtOptions {
    /// Write a header row with the column names.
    #[clap(long)]
    pub header: bool,

    /// Column separator. Must be an ascii character.
    #[clap(long, default_value = ",")]
    pub delimiter: char,

    /// The las file to convert.
    #[clap()]
    pub input_file: PathBuf,

    /// The name of the output file. Overwritten, if it exists.
    #[clap()]
    pub output_file: PathBuf,
}

#[derive(Debug, Parser)]
pub struct InfoOptions {
    /// Pretty-print the json output.
    #[clap(long)]
    pub pretty: bool,

    /// The las file to inspect.
    #[clap()]
    pub input_file: PathBuf,
}
