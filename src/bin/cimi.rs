//! CIMI API CLI binary.
//!
//! A command-line interface for browsing and editing resources on a CIMI server.

use std::process::ExitCode;

use cimi::cli::{load_data, Cli, Command};
use cimi::{Authn, Cimi, CimiClient, PrettyPrint, SearchPage, Value};
use clap::Parser;
use tabled::Table;
use tracing_subscriber::filter::LevelFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let client = match cli.client_config().and_then(CimiClient::from_config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Hint: Set CIMI_ENDPOINT or pass --endpoint with an absolute URL");
            return ExitCode::FAILURE;
        }
    };

    match run(&client, cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            if e.is_auth_error() {
                eprintln!("Hint: Pass --username/--password or set CIMI_USERNAME/CIMI_PASSWORD");
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(client: &CimiClient, cli: Cli) -> cimi::Result<()> {
    let logged_in = match (cli.username.as_deref(), cli.password.as_deref()) {
        (Some(username), Some(password)) => {
            client.login_internal(username, password).await?;
            true
        }
        _ => false,
    };

    let result = execute(client, &cli.command, cli.json).await;

    if logged_in {
        if let Err(e) = client.logout().await {
            tracing::warn!(error = %e, "logout failed");
        }
    }
    result
}

async fn execute(client: &CimiClient, command: &Command, json: bool) -> cimi::Result<()> {
    match command {
        Command::Cep => {
            let cep = client.cloud_entry_point().await?;
            if json {
                output_json(cep.document())?;
            } else {
                println!("{}", cep.pretty_print());
            }
        }
        Command::Get { reference } => {
            let resource = client.get(reference).await?;
            output_single(&resource, json)?;
        }
        Command::Search {
            resource_type, all, ..
        } => {
            let params = command.search_params().unwrap_or_default();
            if *all {
                let resources = client.search_all(resource_type, &params).await?;
                if json {
                    output_json(&Value::from(resources))?;
                } else {
                    let rows: Vec<cimi::output::ResourceRow> =
                        resources.iter().map(Into::into).collect();
                    println!("{}", Table::new(rows));
                    println!("\n{} resources", resources.len());
                }
            } else {
                let page = client.search_page(resource_type, &params).await?;
                output_page(&page, json)?;
            }
        }
        Command::Add {
            resource_type,
            data,
        } => {
            let data = load_data(data)?;
            let response = client.add(resource_type, &data).await?;
            output_single(&response, json)?;
        }
        Command::Edit { reference, data } => {
            let data = load_data(data)?;
            let resource = client.edit(reference, &data).await?;
            output_single(&resource, json)?;
        }
        Command::Delete { reference } => {
            let response = client.delete(reference).await?;
            output_single(&response, json)?;
        }
    }
    Ok(())
}

fn output_json(document: &Value) -> cimi::Result<()> {
    let json = document.to_json()?;
    println!(
        "{}",
        serde_json::to_string_pretty(&json).map_err(|e| cimi::CimiError::UnsupportedValue(e.to_string()))?
    );
    Ok(())
}

fn output_single(document: &Value, json: bool) -> cimi::Result<()> {
    if json {
        output_json(document)
    } else {
        println!("{}", document.pretty_print());
        Ok(())
    }
}

fn output_page(page: &SearchPage, json: bool) -> cimi::Result<()> {
    if json {
        output_json(&Value::from(page.resources.clone()))
    } else {
        println!("{}", page.pretty_print());
        Ok(())
    }
}
