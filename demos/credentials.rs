//! Credential walkthrough against a CIMI server.
//!
//! Logs in, generates an SSH key pair credential, reads it back, searches
//! the collection, deletes the credential and logs out.
//!
//! Run with:
//! ```
//! cargo run --example credentials -- <username> <password>
//! ```
//!
//! Set `CIMI_ENDPOINT` to target a server other than `https://nuv.la`.

use std::env;

use cimi::{internal_login, Authn, Cimi, CimiClient, CimiError, Value};

#[tokio::main]
async fn main() -> cimi::Result<()> {
    // Initialize tracing for debugging (optional)
    tracing_subscriber::fmt::init();

    let mut args = env::args().skip(1);
    let (Some(username), Some(password)) = (args.next(), args.next()) else {
        return Err(CimiError::ConfigMissing(
            "you must provide a username and password".to_string(),
        ));
    };
    println!("Username: {username}");

    let client = CimiClient::from_env()?;
    println!("Endpoint: {}", client.endpoint());

    // The catalog of resource collections; hrefs are relative to baseURI
    println!("\n--- Cloud Entry Point ---");
    let cep = client.cloud_entry_point().await?;
    println!("baseURI: {}", cep.base_uri());
    for (name, href) in cep.collections() {
        println!("  - {name} -> {href}");
    }

    println!("\nActive session? {}", client.is_authenticated());

    println!("\n--- Login ---");
    let response = client.login(&internal_login(&username, &password)).await?;
    println!("Login response: {response}");
    println!("Active session? {}", client.is_authenticated());

    // The server generates the key pair, so the template href is enough
    println!("\n--- Add Credential ---");
    let template = Value::mapping([(
        "credentialTemplate",
        Value::mapping([("href", "credential-template/generate-ssh-key-pair")]),
    )]);
    let response = client.add("credentials", &template).await?;
    println!("Add credential response: {response}");

    let resource_id = response
        .get_str("resource-id")
        .ok_or_else(|| CimiError::MalformedDocument {
            message: "add response has no resource-id".to_string(),
            fragment: response.to_string(),
        })?
        .to_string();
    let resource_url = cep.base_uri().join(&resource_id)?;
    println!("Created resource: {resource_id}");
    println!("Created resource URL: {resource_url}");

    println!("\n--- Get Credential ---");
    let credential = client.get(resource_url.as_str()).await?;
    println!("Created SSH public key resource: {credential}");

    println!("\n--- Search Credentials ---");
    let response = client.search("credentials").await?;
    println!(
        "Found {} credentials",
        response.get("count").and_then(Value::as_u64).unwrap_or(0)
    );

    println!("\n--- Delete Credential ---");
    let response = client.delete(resource_url.as_str()).await?;
    println!("Delete response: {response}");

    match client.get(resource_url.as_str()).await {
        Ok(_) => println!("There was a problem. The resource {resource_url} still exists!"),
        Err(e) if e.is_not_found() => println!("The resource is gone."),
        Err(e) => return Err(e),
    }

    println!("\n--- Logout ---");
    let response = client.logout().await?;
    println!("Logout response: {response}");
    println!("Active session? {}", client.is_authenticated());

    Ok(())
}
