use log::LevelFilter;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use nitf_imhdr::{Policy, Version};

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Level {
    /// A level lower than all log levels.
    Off,
    /// Corresponds to the `Error` log level.
    Error,
    /// Corresponds to the `Warn` log level.
    Warn,
    /// Corresponds to the `Info` log level.
    Info,
    /// Corresponds to the `Debug` log level.
    Debug,
    /// Corresponds to the `Trace` log level.
    Trace,
}

impl From<Level> for LevelFilter {
    fn from(value: Level) -> Self {
        match value {
            Level::Off => LevelFilter::Off,
            Level::Error => LevelFilter::Error,
            Level::Warn => LevelFilter::Warn,
            Level::Info => LevelFilter::Info,
            Level::Debug => LevelFilter::Debug,
            Level::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum PolicyArg {
    /// Fail on the first inconsistent field
    Strict,
    /// Warn and correct inconsistent fields
    Lenient,
}

impl From<PolicyArg> for Policy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::Strict => Policy::Strict,
            PolicyArg::Lenient => Policy::Lenient,
        }
    }
}

/// Dump NITF image segment subheaders as JSON.
#[derive(Parser, Debug)]
pub struct Cli {
    /// Input NITF file
    pub input: PathBuf,

    /// Byte offset of an image subheader (the `IM` tag). Repeat for several segments.
    #[arg(short, long, required = true)]
    pub offset: Vec<usize>,

    /// Read NITF 2.0 subheaders
    #[arg(long, action)]
    pub legacy: bool,

    /// Also decode the mask subheader that follows masked subheaders
    #[arg(short, long, action)]
    pub mask: bool,

    /// How to treat inconsistent fields
    #[arg(long, default_value = "lenient")]
    pub policy: PolicyArg,

    /// Log level
    #[arg(long, default_value = "info")]
    pub level: Level,
}

impl Cli {
    pub fn version(&self) -> Version {
        match self.legacy {
            true => Version::V20,
            false => Version::V21,
        }
    }
}
