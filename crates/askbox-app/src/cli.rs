use clap::Parser;

/// askbox: a terminal client for a question-answering chat service.
#[derive(Parser, Debug)]
#[command(name = "askbox", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<String>,

    /// Log level override (debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Keep the session in memory only; nothing is written to disk.
    #[arg(long)]
    pub memory: bool,

    /// Ask a single question, print the reply, and exit.
    #[arg(short = 'q', long)]
    pub ask: Option<String>,
}

pub fn parse() -> Args {
    Args::parse()
}
