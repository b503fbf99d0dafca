use axum::http::{header, HeaderMap, Method};
use clap::{Parser, Subcommand};
use serde_json::Value;

use bff_gateway::config::GatewayConfig;
use bff_gateway::upstream::{
    session_cookies, ApiClient, FetchOutcome, SubmitBody, SubmitClient, SubmitOutcome, Submission,
};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Talk to the API Server the way the gateway does", long_about = None)]
struct Cli {
    /// API Server origin.
    #[arg(short, long, default_value = "http://localhost:3000")]
    api: String,

    /// CSRF endpoint on the API Server.
    #[arg(long, default_value = "/csrf")]
    csrf_path: String,

    /// Where unauthenticated requests are sent.
    #[arg(long, default_value = "/users/sign_in")]
    login_path: String,

    /// Cookie header to send, e.g. a signed-in session.
    #[arg(short, long)]
    cookie: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a fresh authenticity token
    Csrf,
    /// Fetch a resource and classify the answer
    Get { path: String },
    /// Submit a form (CSRF token fetched first) and classify the answer
    Submit {
        #[arg(value_parser = parse_method)]
        method: Method,
        path: String,
        /// Form field as key=value, repeatable
        #[arg(short, long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
}

fn parse_method(raw: &str) -> Result<Method, String> {
    Method::from_bytes(raw.to_ascii_uppercase().as_bytes()).map_err(|e| e.to_string())
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = GatewayConfig::default();
    config.api.base_url = cli.api;
    config.api.csrf_path = cli.csrf_path;
    config.api.login_path = cli.login_path;
    let api = ApiClient::from_config(&config)?;

    let mut inbound = HeaderMap::new();
    if let Some(cookie) = &cli.cookie {
        inbound.insert(header::COOKIE, cookie.parse()?);
    }

    match cli.command {
        Commands::Csrf => {
            let (token, _) = api.fetch_csrf_token(&inbound).await;
            if token.is_empty() {
                eprintln!("Warning: no authenticity_token obtained");
            }
            println!("{}", token.as_str());
        }
        Commands::Get { path } => {
            let fetched = api.fetch_json::<Value>(&path, &inbound).await?;
            match fetched.outcome {
                FetchOutcome::Success(json) => println!("{}", serde_json::to_string_pretty(&json)?),
                FetchOutcome::Redirect { destination, .. } => println!("redirect → {destination}"),
                FetchOutcome::NotFound => println!("not found"),
            }
        }
        Commands::Submit { method, path, fields } => {
            let (token, relayed) = api.fetch_csrf_token(&inbound).await;
            if token.is_empty() {
                eprintln!("Warning: no authenticity_token obtained, the API will likely refuse");
            }
            // The token is bound to the session the CSRF call just opened.
            if let Some(cookies) = session_cookies(&relayed) {
                inbound.insert(header::COOKIE, cookies);
            }

            let submission = Submission {
                method,
                path,
                body: SubmitBody::Form(fields),
                token,
            };
            let outcome = SubmitClient::new(api).submit(&submission, &inbound).await?;
            print_outcome(outcome)?;
        }
    }

    Ok(())
}

fn print_outcome(outcome: SubmitOutcome) -> Result<(), serde_json::Error> {
    match outcome {
        SubmitOutcome::Success(body) => println!("{}", serde_json::to_string_pretty(&body)?),
        SubmitOutcome::Redirect(destination) => println!("redirect → {destination}"),
        SubmitOutcome::NotFound => println!("not found"),
        SubmitOutcome::ValidationFailed(errors) => {
            for message in errors.messages() {
                println!("invalid: {message}");
            }
        }
        SubmitOutcome::Rejected { status } => println!("rejected ({status})"),
    }
    Ok(())
}
