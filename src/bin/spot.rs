use std::path::PathBuf;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use als_spot_toolbox::config::{ConfigLoader, ResolvedConfig};
use als_spot_toolbox::credentials::{CredentialProvider, EnvCredentials, PromptCredentials};
use als_spot_toolbox::domain::SortOrder;
use als_spot_toolbox::error::SpotError;
use als_spot_toolbox::files::{archive_paths, bulk_copy, list_local_files, parse_file_list};
use als_spot_toolbox::output::{JsonOutput, OutputMode};
use als_spot_toolbox::query::{DEFAULT_SEARCH_LIMIT, DEFAULT_SORT_FIELD, SearchQuery};
use als_spot_toolbox::session::Session;
use als_spot_toolbox::transfer::Destination;
use als_spot_toolbox::transport::HttpTransport;

#[derive(Parser)]
#[command(name = "spot")]
#[command(about = "Search, stage and download ALS tomography datasets from the SPOT portal")]
#[command(version)]
struct Cli {
    #[arg(
        long,
        global = true,
        help = "Never prompt; take credentials from SPOT_USERNAME / SPOT_PASSWORD"
    )]
    non_interactive: bool,

    #[arg(long, global = true, help = "Path to a spot.json config file")]
    config: Option<String>,

    #[arg(long, global = true, help = "SPOT login account")]
    login: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Log in and report whether the session is authenticated")]
    Auth,
    #[command(about = "Search datasets")]
    Search(SearchArgs),
    #[command(about = "List derived datasets (norm, sino, gridrec, ...)")]
    Derived(NameArgs),
    #[command(about = "List images inside a dataset")]
    Images(DatasetArgs),
    #[command(about = "Show dataset or image attributes")]
    Attrs(AttrsArgs),
    #[command(about = "Stage datasets from tape to disk")]
    Stage(BatchArgs),
    #[command(about = "Download raw datasets (.h5)")]
    Download(DownloadArgs),
    #[command(about = "Download a single image (.tif)")]
    DownloadImage(ImageArgs),
    #[command(about = "Show download URLs for a single image")]
    Urls(ImageUrlArgs),
    #[command(about = "Submit a TomoPy reconstruction job")]
    Tomopy(NameArgs),
    #[command(about = "Print NERSC archive directories for datasets")]
    ArchivePath(ArchiveArgs),
    #[command(about = "Copy raw datasets from the NERSC archive mount")]
    Copy(CopyArgs),
    #[command(about = "List local .h5 files")]
    Local(LocalArgs),
}

#[derive(Args)]
struct SearchArgs {
    query: String,
    #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
    limit: usize,
    #[arg(long, default_value_t = 0)]
    skip: usize,
    #[arg(long, default_value = DEFAULT_SORT_FIELD)]
    sort_field: String,
    #[arg(long, value_enum, default_value_t = SortOrder::Desc)]
    sort_order: SortOrder,
}

#[derive(Args)]
struct NameArgs {
    dataset: String,
}

#[derive(Args)]
struct DatasetArgs {
    dataset: String,
    #[arg(long, help = "Owner of the dataset when not embedded as user/dataset")]
    user: Option<String>,
}

#[derive(Args)]
struct AttrsArgs {
    #[command(flatten)]
    dataset: DatasetArgs,
    #[arg(long, help = "HDF5 group, / for the whole dataset")]
    group: Option<String>,
}

#[derive(Args)]
struct BatchArgs {
    datasets: Vec<String>,
    #[arg(long, help = "File with one dataset per line, # comments")]
    list: Option<Utf8PathBuf>,
    #[arg(long)]
    user: Option<String>,
}

#[derive(Args)]
struct DownloadArgs {
    #[command(flatten)]
    batch: BatchArgs,
    #[arg(long)]
    dir: Option<PathBuf>,
    #[arg(long, help = "Output file name; only valid for a single dataset")]
    name: Option<String>,
}

#[derive(Args)]
struct ImageUrlArgs {
    #[command(flatten)]
    dataset: DatasetArgs,
    #[arg(long, default_value = "raw")]
    kind: String,
    #[arg(long, default_value_t = 0)]
    index: usize,
}

#[derive(Args)]
struct ImageArgs {
    #[command(flatten)]
    image: ImageUrlArgs,
    #[arg(long)]
    dir: Option<PathBuf>,
    #[arg(long)]
    name: Option<String>,
}

#[derive(Args)]
struct ArchiveArgs {
    filenames: Vec<String>,
    #[arg(long)]
    list: Option<Utf8PathBuf>,
    #[arg(long)]
    account: Option<String>,
    #[arg(long)]
    root: Option<Utf8PathBuf>,
}

#[derive(Args)]
struct CopyArgs {
    #[command(flatten)]
    archive: ArchiveArgs,
    #[arg(long)]
    dest: Utf8PathBuf,
}

#[derive(Args)]
struct LocalArgs {
    #[arg(default_value = ".")]
    dir: Utf8PathBuf,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<SpotError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &SpotError) -> u8 {
    match error {
        SpotError::DerivedNotFound { .. } | SpotError::ImageIndexOutOfRange { .. } => 2,
        SpotError::RemoteStatus { .. }
        | SpotError::RemoteDecode { .. }
        | SpotError::Network { .. } => 3,
        SpotError::Auth(_) | SpotError::NotAuthenticated | SpotError::Credentials(_) => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };
    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let login = cli.login.or_else(|| config.username.clone());

    match cli.command {
        Command::ArchivePath(args) => {
            let (filenames, account, root) = archive_inputs(&args, &config, login.as_deref())?;
            let paths = archive_paths(&filenames, &account, &root);
            JsonOutput::print(&paths).into_diagnostic()
        }
        Command::Copy(args) => {
            let (filenames, account, root) =
                archive_inputs(&args.archive, &config, login.as_deref())?;
            let outcomes = bulk_copy(&filenames, &account, &args.dest, &root)?;
            JsonOutput::print(&outcomes).into_diagnostic()
        }
        Command::Local(args) => {
            let files = list_local_files(&args.dir)?;
            JsonOutput::print(&files).into_diagnostic()
        }
        command => {
            let mut session = open_session(&config, login, output_mode)?;
            let result = run_remote(command, &session);
            session.close();
            result
        }
    }
}

fn open_session(
    config: &ResolvedConfig,
    login: Option<String>,
    output_mode: OutputMode,
) -> miette::Result<Session<HttpTransport>> {
    let provider: Box<dyn CredentialProvider> = match output_mode {
        OutputMode::Interactive => Box::new(PromptCredentials { username: login }),
        OutputMode::NonInteractive => Box::new(EnvCredentials { username: login }),
    };
    let transport = HttpTransport::new(config.timeout)?;
    Ok(Session::login(transport, config.endpoints(), provider.as_ref())?)
}

fn run_remote(command: Command, session: &Session<HttpTransport>) -> miette::Result<()> {
    match command {
        Command::Auth => {
            let authenticated = session.check_authenticated()?;
            JsonOutput::print(&json!({
                "username": session.username(),
                "authenticated": authenticated,
            }))
            .into_diagnostic()
        }
        Command::Search(args) => {
            let query = SearchQuery::new(args.query)
                .with_limit(args.limit)
                .with_skip(args.skip)
                .with_sort(args.sort_field, args.sort_order);
            JsonOutput::print(&session.search(&query)?).into_diagnostic()
        }
        Command::Derived(args) => {
            JsonOutput::print(&session.derived_datasets(&args.dataset)?).into_diagnostic()
        }
        Command::Images(args) => {
            let images = session.list_images(&args.dataset, args.user.as_deref())?;
            JsonOutput::print(&images).into_diagnostic()
        }
        Command::Attrs(args) => {
            let attributes = session.attributes(
                &args.dataset.dataset,
                args.dataset.user.as_deref(),
                args.group.as_deref(),
            )?;
            JsonOutput::print(&attributes).into_diagnostic()
        }
        Command::Stage(args) => {
            let datasets = batch_inputs(&args)?;
            let outcomes = session.stage_many(&datasets, args.user.as_deref())?;
            JsonOutput::print(&outcomes).into_diagnostic()
        }
        Command::Download(args) => {
            let datasets = batch_inputs(&args.batch)?;
            if args.name.is_some() && datasets.len() > 1 {
                return Err(miette::Report::msg("--name requires a single dataset"));
            }
            let destination = Destination::new(args.dir, args.name);
            let mut written = Vec::with_capacity(datasets.len());
            for dataset in &datasets {
                written.push(session.download_dataset(
                    dataset,
                    args.batch.user.as_deref(),
                    &destination,
                )?);
            }
            JsonOutput::print(&written).into_diagnostic()
        }
        Command::DownloadImage(args) => {
            let image = &args.image;
            let destination = Destination::new(args.dir, args.name);
            let written = session.download_image(
                &image.dataset.dataset,
                image.dataset.user.as_deref(),
                &image.kind,
                image.index,
                &destination,
            )?;
            JsonOutput::print(&written).into_diagnostic()
        }
        Command::Urls(args) => {
            let urls = session.download_urls(
                &args.dataset.dataset,
                args.dataset.user.as_deref(),
                &args.kind,
                args.index,
            )?;
            JsonOutput::print(&urls).into_diagnostic()
        }
        Command::Tomopy(args) => {
            JsonOutput::print(&session.tomopy_job(&args.dataset)?).into_diagnostic()
        }
        Command::ArchivePath(_) | Command::Copy(_) | Command::Local(_) => Ok(()),
    }
}

fn batch_inputs(args: &BatchArgs) -> miette::Result<Vec<String>> {
    collect_names(&args.datasets, args.list.as_ref())
}

fn archive_inputs(
    args: &ArchiveArgs,
    config: &ResolvedConfig,
    login: Option<&str>,
) -> miette::Result<(Vec<String>, String, Utf8PathBuf)> {
    let filenames = collect_names(&args.filenames, args.list.as_ref())?;
    let account = args
        .account
        .clone()
        .or_else(|| config.archive_account.clone())
        .or_else(|| login.map(str::to_string))
        .ok_or_else(|| {
            miette::Report::msg(
                "archive account required (--account, SPOT_ARCHIVE_ACCOUNT or --login)",
            )
        })?;
    let root = args
        .root
        .clone()
        .unwrap_or_else(|| config.archive_root.clone());
    Ok((filenames, account, root))
}

fn collect_names(
    names: &[String],
    list: Option<&Utf8PathBuf>,
) -> miette::Result<Vec<String>> {
    let mut all = names.to_vec();
    if let Some(list) = list {
        all.extend(parse_file_list(list, "#")?);
    }
    if all.is_empty() {
        return Err(miette::Report::msg("no datasets given (pass names or --list FILE)"));
    }
    Ok(all)
}
