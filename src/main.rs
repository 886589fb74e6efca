mod cli;

use std::{
    io::{self, Read},
    sync::{Arc, Mutex},
};

use anyhow::{bail, Context, Result};
use coderun::{
    printer::{EventPrinter, MarkdownPrinter},
    CodeRunner, Config, DirectRequest, EventSink, Notification, Settings, TranscriptRequest,
};
use is_terminal::IsTerminal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    init_tracing(args.debug);

    // CLI flags override config file and environment
    let cfg = Config::load();
    let mut settings = Settings::from_config(&cfg)
        .with_context(|| format!("invalid configuration (see {})", cfg.config_path.display()))?;
    if let Some(seconds) = args.timeout {
        settings = settings.with_max_runtime_seconds(seconds)?;
    }
    if args.debug {
        settings = settings.with_debug(true);
    }

    if io::stdin().is_terminal() {
        bail!("pipe the code to run via stdin, e.g. `echo 'print(1)' | coderun`");
    }
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;

    let messages: Arc<Mutex<Vec<String>>> = Arc::default();
    let sink = {
        let printer = EventPrinter {
            color: io::stderr().is_terminal(),
        };
        let quiet = args.quiet;
        let messages = Arc::clone(&messages);
        EventSink::blocking(move |notification| {
            if !quiet {
                printer.print(notification);
            }
            if let Notification::Message(data) = notification {
                if let Ok(mut guard) = messages.lock() {
                    guard.push(data.content.clone());
                }
            }
            Ok(())
        })
    };

    let runner = CodeRunner::new(settings);
    let result = if args.body {
        let request: TranscriptRequest =
            serde_json::from_str(&input).context("stdin is not a valid transcript body")?;
        serde_json::to_value(runner.run_transcript(&request, Some(sink)).await)?
    } else if args.transcript {
        let request = TranscriptRequest::from_code(args.language, input.trim_end());
        serde_json::to_value(runner.run_transcript(&request, Some(sink)).await)?
    } else {
        let request = DirectRequest {
            language: args.language,
            code: input,
        };
        runner.run_direct(&request, Some(sink)).await
    };

    if args.md {
        let printer = MarkdownPrinter::default();
        if let Ok(guard) = messages.lock() {
            for content in guard.iter() {
                printer.print(content);
            }
        }
    }

    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}

fn init_tracing(debug: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if debug { "coderun=debug" } else { "warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
