use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about = "Habit tracker API server")]
pub struct Cli {
    /// Port to listen on (overrides SERVER_API_PORT)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Keep data in memory instead of Redis; everything is lost on exit
    #[arg(short, long)]
    pub memory: bool,

    /// Emit logs as JSON (overrides LOG_FORMAT)
    #[arg(long)]
    pub json_logs: bool,
}

pub fn parse_cli_args() -> Cli {
    Cli::parse()
}
