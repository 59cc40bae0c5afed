//! The sonargeo command line
use crate::config::{BitDepth, ConvertConfig};
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(version, about = "Georeference sidescan sonar files")]
pub struct Args {
    /// Increase logging, once for info and twice for debug
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    /// The command to run
    #[command(subcommand)]
    pub cmd: Action,
}

/// Options shared by the commands that build a raster
#[derive(clap::Args, Debug)]
pub struct RasterOptions {
    /// An XTF file or a directory of XTF files
    pub input: PathBuf,
    /// Directory the artifacts are written to
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,
    /// Bits per sample of the raster, 8 or 16
    #[arg(short, long, default_value_t = 8)]
    pub bitdepth: u8,
    /// Halve the width of the raster
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub resize_half_width: bool,
    /// Equalize the intensity histogram
    #[arg(long)]
    pub histogram_equalization: bool,
    /// Drop columns with a mean amplitude below this value, negative to keep all
    #[arg(long, default_value_t = 7, allow_negative_numbers = true)]
    pub column_threshold: i32,
}

impl RasterOptions {
    /// The conversion options described by the arguments
    pub fn config(&self) -> crate::error::Result<ConvertConfig> {
        Ok(ConvertConfig {
            bitdepth: BitDepth::try_from(self.bitdepth)?,
            resize_half_width: self.resize_half_width,
            histogram_equalization: self.histogram_equalization,
            column_threshold: self.column_threshold,
        })
    }
}

/// Subcommands
#[derive(clap::Subcommand, Debug)]
pub enum Action {
    /// Write a georeferenced image, its sidecars and a GeoTIFF
    Convert {
        #[command(flatten)]
        options: RasterOptions,
    },
    /// Write the intensity raster as a plain TIFF
    Render {
        #[command(flatten)]
        options: RasterOptions,
    },
    /// Print a summary of an XTF file
    Info {
        /// The XTF file
        path: PathBuf,
    },
}

/// Run a command
pub fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    match args.cmd {
        Action::Convert { options } => {
            convert::convert(&options)?;
        }
        Action::Render { options } => {
            convert::render(&options)?;
        }
        Action::Info { path } => {
            info::info(path)?;
        }
    };
    Ok(())
}

pub mod convert;
pub mod info;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn convert_defaults() {
        let args = Args::try_parse_from(["sonargeo", "convert", "a.xtf"]).unwrap();
        match args.cmd {
            Action::Convert { options } => {
                assert_eq!(options.output, PathBuf::from("."));
                assert_eq!(options.config().unwrap(), ConvertConfig::default());
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(args.verbose, 0);
    }

    #[test]
    fn convert_options() {
        let args = Args::try_parse_from([
            "sonargeo",
            "-vv",
            "convert",
            "a.xtf",
            "-o",
            "out",
            "-b",
            "16",
            "--resize-half-width",
            "false",
            "--histogram-equalization",
            "--column-threshold",
            "-1",
        ])
        .unwrap();
        assert_eq!(args.verbose, 2);
        match args.cmd {
            Action::Convert { options } => {
                let config = options.config().unwrap();
                assert_eq!(config.bitdepth, BitDepth::Sixteen);
                assert!(!config.resize_half_width);
                assert!(config.histogram_equalization);
                assert_eq!(config.column_threshold(), None);
                assert_eq!(options.output, PathBuf::from("out"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn unsupported_bitdepth() {
        let args = Args::try_parse_from(["sonargeo", "render", "a.xtf", "-b", "12"]).unwrap();
        match args.cmd {
            Action::Render { options } => assert!(options.config().is_err()),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
