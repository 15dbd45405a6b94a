use std::path::PathBuf;

use clap::Parser;

use crate::zip::CompressionMethod;

#[derive(Parser, Debug)]
#[command(name = "modserve")]
#[command(version)]
#[command(about = "Serve module releases stored as txtar archives over the module proxy protocol", long_about = None)]
#[command(after_help = "Store layout:\n  \
  <DIR>/example.com_!foo_bar_v1.2.0.txt   release v1.2.0 of example.com/Foo/bar\n\n\
Examples:\n  \
  modserve --dir testdata                  serve testdata on localhost:6939\n  \
  GOPROXY=http://localhost:6939 go get example.com/Foo/bar@v1.2.0")]
pub struct Cli {
    /// HTTP address and port to listen on
    #[arg(long = "http", value_name = "ADDR", default_value = "localhost:6939")]
    pub http: String,

    /// Directory to serve txtar archives from
    #[arg(long = "dir", value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Compression method for zip entries
    #[arg(long, value_enum, default_value_t = CompressionMethod::Stored)]
    pub compression: CompressionMethod,

    /// Log every request (-vv => trace)
    #[arg(short = 'v', action = clap::ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short = 'q')]
    pub quiet: bool,
}

impl Cli {
    /// Default log filter when `RUST_LOG` is not set.
    pub fn log_level(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        }
    }
}
