use anyhow::Context;
use churn_gate::client::{ApiClient, ClientError, Session};
use churn_gate::customer::CustomerInput;
use churn_gate::logging;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "churn-client", about = "Command-line client for the churn prediction API")]
struct Cli {
    #[arg(long, env = "CHURN_API_URL", default_value = "http://127.0.0.1:8000")]
    api_url: String,

    #[arg(long, env = "CHURN_SESSION_FILE", default_value = ".churn_session.json")]
    session_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the API is reachable
    Health,
    /// Create an account
    Register { username: String, password: String },
    /// Log in and remember the token
    Login { username: String, password: String },
    /// Forget the local token
    Logout,
    /// Show who is logged in
    Whoami,
    /// Ask the model about one customer
    Predict(CustomerArgs),
}

#[derive(Args)]
struct CustomerArgs {
    #[arg(long, default_value = "Male")]
    gender: String,
    #[arg(long, default_value_t = 45)]
    age: i64,
    #[arg(long, default_value_t = 12)]
    tenure: i64,
    #[arg(long, default_value_t = 3)]
    services: i64,
    #[arg(long, default_value = "Month-to-month")]
    contract: String,
    #[arg(long, default_value_t = 70.5)]
    monthly_charges: f64,
    #[arg(long, default_value_t = 500.5)]
    total_charges: f64,
    #[arg(long, default_value = "Yes")]
    tech_support: String,
    #[arg(long, default_value = "Yes")]
    online_security: String,
    #[arg(long, default_value = "Fiber optic")]
    internet_service: String,
}

impl From<CustomerArgs> for CustomerInput {
    fn from(a: CustomerArgs) -> Self {
        CustomerInput {
            gender: a.gender,
            age: a.age,
            tenure: a.tenure,
            services_subscribed: a.services,
            contract_type: a.contract,
            monthly_charges: a.monthly_charges,
            total_charges: a.total_charges,
            tech_support: a.tech_support,
            online_security: a.online_security,
            internet_service: a.internet_service,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init("warn");
    let cli = Cli::parse();
    let client = ApiClient::new(cli.api_url);
    let mut session = Session::load(&cli.session_file)
        .with_context(|| format!("reading {}", cli.session_file.display()))?;

    match cli.command {
        Command::Health => {
            println!("{}", client.health().await?);
        }
        Command::Register { username, password } => {
            client.register(&username, &password).await?;
            println!("Registration successful! You can now login.");
        }
        Command::Login { username, password } => {
            if let Some(current) = &session.username {
                println!("Replacing session for {current}.");
            }
            let token = client.login(&mut session, &username, &password).await?;
            session.save(&cli.session_file)?;
            println!(
                "Welcome back, {username}! Token valid for {} minutes.",
                token.expires_in / 60
            );
        }
        Command::Logout => {
            session.clear();
            session.save(&cli.session_file)?;
            println!("Logged out.");
        }
        Command::Whoami => match &session.username {
            Some(name) if session.is_logged_in() => println!("Logged in as {name}."),
            _ => println!("Not logged in."),
        },
        Command::Predict(args) => match client.predict(&mut session, args.into()).await {
            Ok(p) => {
                let probability = p
                    .churn_probability
                    .map(|v| format!("{v:.2}"))
                    .unwrap_or_else(|| "n/a".to_string());
                println!("{} (prediction {}, probability {probability})", p.churn_label, p.churn_prediction);
            }
            Err(ClientError::SessionExpired) => {
                session.save(&cli.session_file)?;
                anyhow::bail!(ClientError::SessionExpired);
            }
            Err(ClientError::NotLoggedIn) => {
                anyhow::bail!("Please login to access the prediction tool.");
            }
            Err(e) => return Err(e.into()),
        },
    }

    Ok(())
}
