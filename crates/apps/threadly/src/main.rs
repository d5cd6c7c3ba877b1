//! Threadly console driver
//!
//! Thin command-line front to the mail crate: authenticate, fetch the
//! inbox, group it into conversations, and print JSON. All rendering is
//! left to whatever consumes the output.

use anyhow::{Context, Result, bail};
use log::info;

use mail::{
    GmailAuth, GmailClient, GmailCredentials, OutgoingMessage, fetch_conversations,
    fetch_domain_groups,
};

const DEFAULT_MAX_THREADS: usize = 200;
const DEFAULT_MAX_MESSAGES: usize = 100;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("threads");

    let result = match command {
        "threads" => cmd_threads(parse_limit(&args, 2, DEFAULT_MAX_THREADS)),
        "domains" => cmd_domains(parse_limit(&args, 2, DEFAULT_MAX_MESSAGES)),
        "send" => cmd_send(&args[2..]),
        "logout" => cmd_logout(),
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            std::process::exit(2);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn print_usage() {
    eprintln!("Usage: threadly <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  threads [limit]              Fetch inbox threads as conversations (default)");
    eprintln!("  domains [limit]              Group recent messages by sender domain");
    eprintln!("  send <to> <subject> <body> [thread-id]");
    eprintln!("                               Send a message, optionally as a thread reply");
    eprintln!("  logout                       Revoke and forget stored tokens");
}

fn parse_limit(args: &[String], index: usize, default: usize) -> usize {
    args.get(index)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn make_client() -> Result<GmailClient> {
    config::init()?;
    let credentials = GmailCredentials::load().context(
        "No Gmail credentials found; place google-credentials.json in the config \
         directory or set GMAIL_CLIENT_ID / GMAIL_CLIENT_SECRET",
    )?;
    let auth = GmailAuth::new(credentials.client_id, credentials.client_secret)?;
    Ok(GmailClient::new(auth))
}

fn cmd_threads(limit: usize) -> Result<()> {
    let client = make_client()?;
    let (conversations, stats) = fetch_conversations(&client, limit)?;
    info!(
        "{} conversations from {} listed threads",
        conversations.len(),
        stats.listed
    );
    println!("{}", serde_json::to_string_pretty(&conversations)?);
    Ok(())
}

fn cmd_domains(limit: usize) -> Result<()> {
    let client = make_client()?;
    let (groups, stats) = fetch_domain_groups(&client, limit)?;
    info!(
        "{} buckets, {} unclassified, from {} listed messages",
        groups.buckets.len(),
        groups.unclassified.len(),
        stats.listed
    );
    println!("{}", serde_json::to_string_pretty(&groups)?);
    Ok(())
}

fn cmd_send(args: &[String]) -> Result<()> {
    let [to, subject, body, rest @ ..] = args else {
        bail!("send requires <to> <subject> <body> [thread-id]");
    };

    let outgoing = OutgoingMessage {
        to: to.clone(),
        subject: subject.clone(),
        body: body.clone(),
        thread_id: rest.first().map(|id| id.as_str().into()),
    };

    let client = make_client()?;
    let response = client.send_message(&outgoing)?;
    println!("{}", serde_json::to_string_pretty(&serde_json::json!({
        "success": true,
        "messageId": response.id,
    }))?);
    Ok(())
}

fn cmd_logout() -> Result<()> {
    let credentials = GmailCredentials::load()?;
    let auth = GmailAuth::new(credentials.client_id, credentials.client_secret)?;
    auth.revoke()?;
    println!("Logged out.");
    Ok(())
}
