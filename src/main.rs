use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use mototaxi_registry::api;
use mototaxi_registry::registration::{
    PhotoReference, RegistrationInput, RegistrationRecord, Registry, RegistryConfig, Role,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(name = "mototaxi-registry", about = "Driver approval queue and passenger accounts")]
struct Cli {
    /// TOML config file
    #[clap(long)]
    config: Option<PathBuf>,

    /// Data file, overrides `data_path` from the config
    #[clap(long)]
    data: Option<PathBuf>,

    /// Seed the demo drivers and passengers into an empty data file
    #[clap(long)]
    seed_demo: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Driver registration and login
    #[clap(subcommand)]
    Driver(DriverCommand),
    /// Passenger registration and login
    #[clap(subcommand)]
    Passenger(PassengerCommand),
    /// Registration approval queue
    #[clap(subcommand)]
    Admin(AdminCommand),
    /// Currently logged in user
    #[clap(subcommand)]
    Session(SessionCommand),
    /// Serve the HTTP API
    Serve {
        #[clap(long)]
        listen: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum DriverCommand {
    Register(DriverRegisterArgs),
    Login(LoginArgs),
}

#[derive(Args, Debug)]
struct DriverRegisterArgs {
    /// CNH (driver's license number)
    #[clap(long)]
    license: String,
    #[clap(long)]
    vehicle_document: String,
    #[clap(long)]
    photo_name: Option<String>,
    #[clap(long, default_value_t = 0)]
    photo_size: u64,
    #[clap(long, default_value = "image/jpeg")]
    photo_type: String,
}

#[derive(Args, Debug)]
struct LoginArgs {
    /// Phone number, or the CNH for drivers approved through the queue
    #[clap(long)]
    login: String,
    #[clap(long)]
    password: String,
}

#[derive(Subcommand, Debug)]
enum PassengerCommand {
    Register {
        #[clap(long)]
        name: String,
        #[clap(long)]
        phone: String,
        #[clap(long)]
        password: String,
    },
    Login(LoginArgs),
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    Pending,
    Approved,
    Rejected,
    Stats,
    /// Add a canned test registration
    Sample,
    Approve { id: u64 },
    Reject { id: u64 },
}

#[derive(Subcommand, Debug)]
enum SessionCommand {
    Show {
        /// Fail unless the logged in user has this role
        #[clap(long, value_enum)]
        role: Option<RoleArg>,
    },
    Logout,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum RoleArg {
    Passenger,
    Driver,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Passenger => Role::Passenger,
            RoleArg::Driver => Role::Driver,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mototaxi_registry=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let data_path = config.data_path.clone();
    let mut registry = Registry::open_file(config)
        .with_context(|| format!("open data file {}", data_path.display()))?;

    match cli.command {
        Command::Driver(DriverCommand::Register(args)) => {
            let photo = args
                .photo_name
                .map(|name| PhotoReference::new(name, args.photo_size, args.photo_type));
            let input = RegistrationInput::new(args.license, args.vehicle_document, photo);
            let record = registry.submit_registration(input)?;
            println!("Registration {} submitted, waiting for approval", record.id);
        }
        Command::Driver(DriverCommand::Login(args)) => {
            let session = registry.login_driver(&args.login, &args.password)?;
            println!("Welcome, {}!", session.name);
            print_json(&session)?;
        }
        Command::Passenger(PassengerCommand::Register {
            name,
            phone,
            password,
        }) => {
            let account = registry.register_passenger(&name, &phone, &password)?;
            println!("Passenger '{}' registered with phone {}", account.name, account.phone);
        }
        Command::Passenger(PassengerCommand::Login(args)) => {
            let session = registry.login_passenger(&args.login, &args.password)?;
            println!("Welcome, {}!", session.name);
            print_json(&session)?;
        }
        Command::Admin(AdminCommand::Pending) => print_records(registry.pending_registrations()),
        Command::Admin(AdminCommand::Approved) => print_records(registry.approved_registrations()),
        Command::Admin(AdminCommand::Rejected) => print_records(registry.rejected_registrations()),
        Command::Admin(AdminCommand::Stats) => print_json(&registry.stats())?,
        Command::Admin(AdminCommand::Sample) => {
            let record = registry.add_sample_registration()?;
            println!("Test registration {} added", record.id);
        }
        Command::Admin(AdminCommand::Approve { id }) => {
            let driver = registry.approve(id)?;
            println!(
                "Registration {} approved, '{}' can log in as {}",
                id, driver.display_name, driver.login_identifier
            );
        }
        Command::Admin(AdminCommand::Reject { id }) => {
            registry.reject(id)?;
            println!("Registration {} rejected", id);
        }
        Command::Session(SessionCommand::Show { role: Some(role) }) => {
            print_json(registry.require_session(role.into())?)?
        }
        Command::Session(SessionCommand::Show { role: None }) => {
            match registry.current_session() {
                Some(session) => print_json(session)?,
                None => println!("Nobody is logged in"),
            }
        }
        Command::Session(SessionCommand::Logout) => match registry.logout()? {
            Some(session) => println!("Goodbye, {}", session.name),
            None => println!("Nobody is logged in"),
        },
        Command::Serve { listen } => {
            let listen = listen.unwrap_or_else(|| registry.config().listen_addr.clone());
            let addr: SocketAddr = listen
                .parse()
                .with_context(|| format!("parse listen address '{}'", listen))?;
            serve(registry, addr).await?;
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<RegistryConfig> {
    let mut config = match &cli.config {
        Some(path) => RegistryConfig::from_file(path)?,
        None => RegistryConfig::default(),
    };
    if let Some(data) = &cli.data {
        config.data_path = data.clone();
    }
    if cli.seed_demo {
        config = config.with_demo_accounts(true);
    }
    Ok(config)
}

async fn serve(registry: Registry, addr: SocketAddr) -> anyhow::Result<()> {
    let app = api::create_router(api::AppState::new(registry));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {}", addr))?;

    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await.context("serve HTTP API")?;
    Ok(())
}

fn print_records(records: &[RegistrationRecord]) {
    if records.is_empty() {
        println!("No registrations");
        return;
    }
    for record in records {
        println!(
            "#{} [{}] CNH {} | vehicle {} | photo {} ({}) | submitted {}",
            record.id,
            record.status,
            record.license_number,
            record.vehicle_document,
            record.photo.name,
            record.photo.formatted_size(),
            record.submitted_at.format("%d/%m/%Y %H:%M:%S"),
        );
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
