use clap::Parser;
use iitd_proxy::{Config, Credentials, ProxyCategory, SessionClient, SessionEvent, hold_session};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "iitd-proxy")]
#[command(about = "Log in to the IIT Delhi proxy and keep the session alive")]
#[command(version)]
struct Cli {
    /// Proxy username
    username: String,

    /// Proxy category (btech, dual, diit, faculty, integrated, mtech, phd,
    /// retfaculty, staff, irdstaff, mba, mdes, msc, msr, pgdip, research)
    category: ProxyCategory,

    /// Config file (defaults to ./iitd-proxy.toml or ~/.iitd-proxy/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Check connectivity through the proxy after logging in
    #[arg(long)]
    check: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so status lines on stdout stay readable
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::discover(cli.config.as_deref())?;
    let password = rpassword::prompt_password("Password: ")?;
    let client = SessionClient::new(
        Credentials::new(cli.username, password),
        cli.category,
        &config,
    )?;

    // Listening starts before login so an early Ctrl-C still logs out
    hold_session(&client, cli.check, tokio::signal::ctrl_c(), |event| match event {
        SessionEvent::Login(outcome) => println!("\nLogin {}", outcome),
        SessionEvent::Connectivity(connectivity) => println!("Connectivity: {}", connectivity),
        SessionEvent::Expired => println!("Session Expired. Please run the script again."),
        SessionEvent::Logout(outcome) => println!("\nLogout {}", outcome),
    })
    .await;

    Ok(())
}
