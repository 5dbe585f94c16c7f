use crate::infra::{build_store, parse_field, parse_form_kind};
use crate::server;
use clap::{Args, Parser, Subcommand};
use outreach_forms::config::AppConfig;
use outreach_forms::error::AppError;
use outreach_forms::forms::{ClientContext, FormKind, RawSubmission};
use outreach_forms::store::AppendLog;
use outreach_forms::telemetry;

#[derive(Parser, Debug)]
#[command(
    name = "Outreach Forms",
    about = "Collect donation and assistance-application submissions into Google Sheets",
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
    /// Manage the backing spreadsheet
    Sheets {
        #[command(subcommand)]
        command: SheetsCommand,
    },
    /// Run a single submission through validation and the configured store
    Submit(SubmitArgs),
}

#[derive(Subcommand, Debug)]
enum SheetsCommand {
    /// Create the Donations and Applications sheets if they are missing
    Init,
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
struct SubmitArgs {
    /// Which form the fields belong to (donation or application)
    #[arg(long, value_parser = parse_form_kind)]
    form: FormKind,
    /// Form field as key=value; repeat for each field
    #[arg(long = "field", value_parser = parse_field)]
    fields: Vec<(String, String)>,
    /// Simulated X-Forwarded-For header
    #[arg(long)]
    forwarded_for: Option<String>,
    /// Simulated X-Real-IP header
    #[arg(long)]
    real_ip: Option<String>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Sheets {
            command: SheetsCommand::Init,
        } => init_sheets().await,
        Command::Submit(args) => submit(args).await,
    }
}

async fn init_sheets() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let (store, _) = build_store(&config.sheets).await?;
    store.ensure_initialized().await?;

    println!(
        "Sheets ready on {} backend: Donations, Applications",
        store.backend().label()
    );
    Ok(())
}

async fn submit(args: SubmitArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let (_, handler) = build_store(&config.sheets).await?;
    let context = ClientContext {
        forwarded_for: args.forwarded_for,
        real_ip: args.real_ip,
    };
    let form: RawSubmission = args.fields.into_iter().collect();

    let result = handler.handle(args.form, form, &context).await;
    let rendered = serde_json::to_string_pretty(&result)
        .map_err(|err| AppError::Io(std::io::Error::other(err)))?;
    println!("{rendered}");
    Ok(())
}
