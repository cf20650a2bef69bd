//! Glue between the command line binary and the pipeline: input checks,
//! exit codes and the printed JSON.

use clap::{ Arg, App, ErrorKind };
use log::error;

use std::ffi::OsString;
use std::path::{ Path, PathBuf };

use crate::config::PipelineConfig;
use crate::error::LprError;
use crate::image_process::Vision;
use crate::ocr::TextEngine;
use crate::record::{ self, PlateRecord };
use crate::Lpr;

pub const EXIT_OK: i32 = 0;
pub const EXIT_BAD_INPUT: i32 = 1;

pub fn usage() -> PlateRecord {
    PlateRecord::failure(record::MSG_USAGE)
}

/// Parsed command line.
#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    pub input: PathBuf,
    pub config: Option<PathBuf>,
    pub tessdata: Option<String>,
    pub lang: Option<String>,
    pub verbose: bool,
}

impl CliArgs {
    /// Pipeline settings: the config file if given, else defaults, with the
    /// tesseract overrides applied on top.
    pub fn pipeline_config(&self) -> Result<PipelineConfig, LprError> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(dir) = &self.tessdata {
            config.ocr.data_path = Some(dir.clone());
        }
        if let Some(lang) = &self.lang {
            config.ocr.lang = lang.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

fn app() -> App<'static, 'static> {
    App::new("plate-recognition")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Reads a vehicle license plate from a photo and prints the result as JSON")
        .arg(Arg::with_name("INPUT")
            .help("image file with a license plate")
            .required(true)
            .index(1))
        .arg(Arg::with_name("config")
            .long("config")
            .value_name("FILE")
            .help("JSON file with pipeline settings")
            .takes_value(true))
        .arg(Arg::with_name("tessdata")
            .long("tessdata")
            .value_name("DIR")
            .help("directory holding the tesseract language data")
            .takes_value(true))
        .arg(Arg::with_name("lang")
            .long("lang")
            .help("tesseract language")
            .takes_value(true))
        .arg(Arg::with_name("verbose")
            .short("v")
            .help("log pipeline steps to stderr"))
}

/// What the command line asks for.
#[derive(Debug)]
pub enum Invocation {
    Run(CliArgs),
    /// `--help` or `--version`, clap prints and exits
    Builtin(clap::Error),
    /// anything else malformed: missing input, extra positionals, unknown flags
    Usage,
}

pub fn parse_args<I, T>(args: I) -> Invocation
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = match app().get_matches_from_safe(args) {
        Ok(matches) => matches,
        Err(e) if e.kind == ErrorKind::HelpDisplayed || e.kind == ErrorKind::VersionDisplayed => {
            return Invocation::Builtin(e)
        }
        Err(_) => return Invocation::Usage,
    };
    let input = match matches.value_of_os("INPUT") {
        Some(input) => PathBuf::from(input),
        None => return Invocation::Usage,
    };
    Invocation::Run(CliArgs {
        input,
        config: matches.value_of_os("config").map(PathBuf::from),
        tessdata: matches.value_of("tessdata").map(str::to_string),
        lang: matches.value_of("lang").map(str::to_string),
        verbose: matches.is_present("verbose"),
    })
}

/// Run the pipeline on `path`, building it only once the input is known to exist.
/// Returns the record to print and the process exit code.
pub fn run<E, V, F>(path: &Path, build: F) -> (PlateRecord, i32)
where
    E: TextEngine,
    V: Vision,
    F: FnOnce() -> Result<Lpr<E, V>, LprError>,
{
    if !path.exists() {
        return (PlateRecord::failure(record::MSG_FILE_NOT_FOUND), EXIT_BAD_INPUT);
    }
    match build() {
        Ok(mut lpr) => (lpr.recognize_path(path), EXIT_OK),
        Err(e) => {
            error!("could not set up the pipeline: {}", e);
            (PlateRecord::unexpected(e), EXIT_OK)
        }
    }
}

pub fn render(record: &PlateRecord) -> Result<String, LprError> {
    Ok(serde_json::to_string(record)?)
}
