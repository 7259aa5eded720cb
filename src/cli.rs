use clap::Parser;

/// Command-line arguments for pumptui
#[derive(Parser, Debug)]
#[command(version, about = "pumptui - pump performance curve explorer")]
pub struct Args {
    /// Base URL of the pump test data service API.
    /// Defaults to the configured service URL.
    pub url: Option<String>,

    /// Initial rated speed in RPM, used until the service suggests one
    #[arg(long = "speed")]
    pub speed: Option<f64>,

    /// Request timeout in seconds
    #[arg(long = "timeout")]
    pub timeout: Option<u64>,

    /// Enable debug mode to show operational information
    #[arg(long = "debug", action)]
    pub debug: bool,

    /// Print the default configuration file and exit
    #[arg(long = "print-config", action)]
    pub print_config: bool,
}
