use crate::demo::{run_demo, DemoArgs};
use crate::server;
use carshare::error::AppError;
use carshare::marketplace::validation::{check_vin, normalize_vin};
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "carshare",
    about = "Run the car-sharing marketplace or exercise its rules from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Check one or more VINs against the length, alphabet and check digit rules
    Vin(VinArgs),
    /// Walk a booking through its lifecycle on a simulated calendar
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct VinArgs {
    /// VINs to validate
    #[arg(required = true)]
    pub(crate) vins: Vec<String>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Vin(args) => {
            for line in vin_report(&args.vins) {
                println!("{line}");
            }
            Ok(())
        }
        Command::Demo(args) => run_demo(args),
    }
}

fn vin_report(vins: &[String]) -> Vec<String> {
    vins.iter()
        .map(|raw| {
            let vin = normalize_vin(raw);
            match check_vin(&vin) {
                Ok(()) => format!("{vin}: valid"),
                Err(reason) => format!("{vin}: {reason}"),
            }
        })
        .collect()
}
