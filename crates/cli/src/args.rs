use clap::Parser;

/// Search a person's name across social-media sites.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Name to search for. Read from stdin instead with --interactive.
    #[arg(required_unless_present = "interactive")]
    pub name: Option<String>,
    /// Comma separated sites to search. Defaults to every site the server allows.
    #[arg(short, long, value_delimiter = ',')]
    pub sites: Vec<String>,
    /// Location qualifier, e.g. a city or country.
    #[arg(short, long)]
    pub location: Option<String>,
    /// Server base URL. Defaults to http://<bind_addr> from the configuration.
    #[arg(short, long)]
    pub endpoint: Option<String>,
    /// Message language (en, fr). Defaults to the environment locale.
    #[arg(long)]
    pub lang: Option<String>,
    /// Keep results in memory only; ignore the on-disk cache.
    #[arg(long)]
    pub no_cache: bool,
    /// Print results as JSON.
    #[arg(long)]
    pub json: bool,
    /// Accept partial results and list the sites that failed.
    #[arg(long, conflicts_with = "interactive")]
    pub report: bool,
    /// Read one name per line from stdin, searching after input settles.
    #[arg(short, long)]
    pub interactive: bool,
    /// Log debug output on stderr.
    #[arg(short, long)]
    pub verbose: bool,
}
