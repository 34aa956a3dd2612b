// ABOUTME: CLI entrypoint for gdocs command
// ABOUTME: Handles logging setup, error exit codes, and command dispatch

use clap::Parser;
use gdocs::{
    api::ApiClient,
    auth::{AuthState, Authenticator, FileCredentialStore},
    cli::{AuthAction, Cli, Commands, ConfigAction},
    config::{Config, Paths},
    docs::Docs,
    oauth::ClientSecretsFlow,
    output,
    retry::RetryPolicy,
    Error, Result,
};
use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("gdocs: [E{}] {}", e.exit_code(), e);
        std::process::exit(e.exit_code());
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let paths = Paths::new(cli.config_dir)?;
    let store = FileCredentialStore::new(paths.token_file.clone());
    let flow = ClientSecretsFlow::new(paths.client_secrets_file.clone());
    let mut auth = Authenticator::new(&store, &flow);

    let command = match cli.command {
        Commands::Auth { action } => return run_auth(action, &paths, &mut auth),
        Commands::Config { action } => return run_config(action, &paths),
        command => command,
    };

    let config = Config::load(&paths)?;
    auth.load()?;
    let token = auth.ensure_valid()?.access_token.clone();
    let client = ApiClient::new(token, cli.api_base)?;
    let docs = Docs::new(&client, RetryPolicy::default());

    match command {
        Commands::List { limit, format } => {
            let list = docs.list(limit.unwrap_or(config.default_limit))?;
            println!(
                "{}",
                output::format_list(&list, format.unwrap_or(config.output_format))?
            );
        }
        Commands::Get { id, format } => {
            let doc = docs.get(&id)?;
            println!(
                "{}",
                output::format_document(&doc, format.unwrap_or(config.output_format))?
            );
        }
        Commands::Create { title, content } => {
            let doc = docs.create(&title, content.as_deref())?;
            println!("{}", output::format_created(&doc));
        }
        Commands::Update { id, title } => {
            let Some(title) = title else {
                return Err(Error::InvalidArgument(
                    "nothing to update; pass --title to rename the document".into(),
                ));
            };
            docs.rename(&id, &title)?;
            println!("Renamed {} to: {}", id, title.trim());
        }
        Commands::Append { id, text } => {
            docs.append(&id, &text)?;
            println!("Appended {} characters to {}", text.chars().count(), id);
        }
        Commands::Insert { id, text, index } => {
            docs.insert(&id, &text, index)?;
            println!("Inserted {} characters at index {} in {}", text.chars().count(), index, id);
        }
        Commands::Export { id, path } => {
            let bytes = docs.export(&id, &path)?;
            println!("Exported {} to {} ({} bytes)", id, path.display(), bytes);
        }
        Commands::Import { path, title } => {
            let doc = docs.import(&path, title.as_deref())?;
            println!("{}", output::format_created(&doc));
        }
        Commands::Delete { id, force } => {
            if !force {
                let doc = docs.get(&id)?;
                if !confirm(&format!("Move \"{}\" ({}) to the trash?", doc.title, id))? {
                    println!("Cancelled.");
                    return Ok(());
                }
            }
            docs.delete(&id)?;
            println!("Moved {} to the trash.", id);
        }
        Commands::Auth { .. } | Commands::Config { .. } => {}
    }

    Ok(())
}

fn run_auth(action: AuthAction, paths: &Paths, auth: &mut Authenticator<'_>) -> Result<()> {
    match action {
        AuthAction::Login => {
            if auth.load()? == AuthState::Valid && auth.ensure_valid().is_ok() {
                println!("Already authenticated. Run `gdocs auth logout` first to switch accounts.");
                return Ok(());
            }
            paths.ensure_dirs()?;
            auth.login()?;
            println!("Authentication successful.");
        }
        AuthAction::Status => {
            let state = auth.load()?;
            println!("{}", output::format_status(state, auth.credential()));
        }
        AuthAction::Logout => {
            if auth.logout()? {
                println!("Logged out.");
            } else {
                println!("Not logged in.");
            }
        }
    }

    Ok(())
}

fn run_config(action: ConfigAction, paths: &Paths) -> Result<()> {
    let mut config = Config::load(paths)?;
    match action {
        ConfigAction::Show => {
            println!("Config file: {}", paths.config_file.display());
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Set { key, value } => {
            config.set(&key, &value)?;
            config.save(paths)?;
            println!("Saved {} = {}", key, value);
        }
    }

    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{} [y/N] ", prompt);
    io::stderr().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
