//! Connectivity check for every external collaborator.

use anyhow::Result;

use crate::clients::google::GoogleClient;
use crate::clients::oracle::OracleClient;
use crate::clients::rsvp::RsvpClient;
use crate::config::Config;

/// Probe each collaborator and report. Returns an error if any probe
/// failed, after trying them all.
pub async fn run(config: &Config) -> Result<()> {
    let mut failures = 0;

    let oracle = OracleClient::new(
        &config.oracle.base_url,
        &config.oracle.username,
        &config.oracle.password,
    );
    match oracle.health().await {
        Ok(()) => println!("oracle: ok"),
        Err(err) => {
            println!("oracle: FAILED ({err:#})");
            failures += 1;
        }
    }

    match GoogleClient::connect(
        &config.google.client_id,
        &config.google.client_secret,
        &config.google.refresh_token,
    )
    .await
    {
        Ok(google) => match google.list_documents().await {
            Ok(documents) => println!("google: ok ({} documents visible)", documents.len()),
            Err(err) => {
                println!("google: FAILED ({err:#})");
                failures += 1;
            }
        },
        Err(err) => {
            println!("google: FAILED ({err:#})");
            failures += 1;
        }
    }

    let rsvp = RsvpClient::new(&config.rsvp.api_key);
    match rsvp.list_events().await {
        Ok(events) => println!("rsvp: ok ({} events listed)", events.len()),
        Err(err) => {
            println!("rsvp: FAILED ({err:#})");
            failures += 1;
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} collaborator check(s) failed");
    }
    println!("all collaborators reachable");
    Ok(())
}
