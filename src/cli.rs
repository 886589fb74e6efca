use clap::{ArgGroup, Parser};

use coderun::Language;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "coderun",
    version,
    about = "Run Python or shell code read from stdin and print the JSON result",
    long_about = "Run Python or shell code read from stdin and print the JSON result.\n\n\
WARNING: there is no sandboxing. Code runs as a plain subprocess with your privileges."
)]
#[command(group(ArgGroup::new("shape").args(["transcript", "body"]).multiple(false)))]
pub struct Cli {
    /// Language of the code to run (python or bash).
    #[arg(long, default_value = "python")]
    pub language: Language,

    /// Wrap stdin in a single assistant message and go through code-block selection.
    #[arg(long)]
    pub transcript: bool,

    /// Treat stdin as a JSON transcript body: {"messages": [{"role", "content"}, ...]}.
    #[arg(long)]
    pub body: bool,

    /// Maximum number of seconds the code may run (overrides MAX_RUNTIME_SECONDS).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Enable debug mode: diagnostic statuses and debug logging.
    #[arg(long)]
    pub debug: bool,

    /// Render the final message as markdown on stderr.
    #[arg(long)]
    pub md: bool,

    /// Do not print events to stderr.
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
