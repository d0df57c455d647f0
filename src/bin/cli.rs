// src/bin/cli.rs
//
// Command-line front-end: derive a result link, or watch the result page with
// automatic reloads and prev/next paging.

use beup_result_core::{
    Derivation, HttpFrame, NavigationParams, ResultForm, SiteConfig, UrlDeriver, ViewerController,
    ViewerEvent, ViewerExit, forward_commands,
};
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "beup-result")]
#[command(version, about = "Find and view BEUP semester results", long_about = None)]
struct Cli {
    /// Log level filter (e.g. info, debug, beup_result_core=trace)
    #[arg(long, env = "BEUP_LOG", default_value = "info")]
    log_level: String,

    /// Results site origin
    #[arg(long, env = "BEUP_ORIGIN")]
    origin: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Work out the result page for a registration number and semester
    Derive {
        registration_number: String,
        /// Roman numeral, I to VIII
        semester: String,
        /// Print the locator as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the viewer query string for a registration number and semester
    Link {
        registration_number: String,
        semester: String,
    },
    /// Load the result page, reloading until it succeeds.
    ///
    /// Type `n` (next), `p` (prev), `c` (stop reloading) or `q` (quit) and press enter.
    View {
        #[arg(required_unless_present = "query")]
        registration_number: Option<String>,
        #[arg(required_unless_present = "query")]
        semester: Option<String>,
        /// Viewer query string (`basePath=..&semester=..&regNo=..` or `url=..`)
        #[arg(long, conflicts_with_all = ["registration_number", "semester"])]
        query: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let mut config = match SiteConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(origin) = cli.origin {
        config = config.with_origin(origin);
        if let Err(e) = config.validate() {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    }

    match cli.command {
        Commands::Derive {
            registration_number,
            semester,
            json,
        } => print_derivation(&config, &registration_number, &semester, json),
        Commands::Link {
            registration_number,
            semester,
        } => match submit(&config, &registration_number, &semester) {
            Some(derivation) => {
                println!("?{}", NavigationParams::from(&derivation.locator).to_query());
                ExitCode::SUCCESS
            }
            None => ExitCode::FAILURE,
        },
        Commands::View {
            registration_number,
            semester,
            query,
        } => {
            let query = match (query, registration_number, semester) {
                (Some(query), _, _) => query,
                (None, Some(reg), Some(sem)) => match submit(&config, &reg, &sem) {
                    Some(derivation) => NavigationParams::from(&derivation.locator).to_query(),
                    None => return ExitCode::FAILURE,
                },
                _ => String::new(),
            };
            view(&config, &query).await
        }
    }
}

/// Validates the form like the web entry screen does, printing field errors.
fn submit(config: &SiteConfig, registration_number: &str, semester: &str) -> Option<Derivation> {
    let form = ResultForm::new(registration_number, semester);
    if let Err(errors) = form.validate() {
        for error in errors {
            eprintln!("{:?}: {}", error.field, error.message);
        }
        return None;
    }

    match form.submit_detailed(&UrlDeriver::new(config)) {
        Ok(derivation) => Some(derivation),
        Err(e) => {
            eprintln!("{e}");
            None
        }
    }
}

fn print_derivation(config: &SiteConfig, registration_number: &str, semester: &str, json: bool) -> ExitCode {
    let Some(derivation) = submit(config, registration_number, semester) else {
        return ExitCode::FAILURE;
    };
    let locator = &derivation.locator;

    if json {
        match serde_json::to_string_pretty(locator) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    println!(
        "Batch {}, semester {} ({}), exam year {}",
        derivation.batch_start_year,
        derivation.semester,
        derivation.semester.ordinal(),
        derivation.exam_year
    );
    println!("{}", locator.effective_url());
    println!(
        "This link follows the most common result page naming. If it does not open your result, look it up on {} directly.",
        config.origin
    );
    ExitCode::SUCCESS
}

async fn view(config: &SiteConfig, query: &str) -> ExitCode {
    let frame = match HttpFrame::new(config) {
        Ok(frame) => Arc::new(frame),
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ViewerEvent>();
    let (command_tx, command_rx) = mpsc::channel(8);

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            println!(
                "[{}] #{} {:?} {}",
                event.at.format("%H:%M:%S"),
                event.nonce,
                event.state,
                event.url.as_deref().unwrap_or("-")
            );
        }
    });

    tokio::spawn(forward_commands(
        BufReader::new(tokio::io::stdin()),
        command_tx,
        async {
            tokio::signal::ctrl_c().await.ok();
        },
    ));

    let mut controller = match ViewerController::new(config, frame) {
        Ok(controller) => controller.with_events(event_tx),
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    match controller.run_from_query(query, command_rx).await {
        ViewerExit::Closed => ExitCode::SUCCESS,
        ViewerExit::RedirectToEntry => {
            eprintln!("No result selected. Run `beup-result derive` first.");
            ExitCode::from(2)
        }
    }
}
