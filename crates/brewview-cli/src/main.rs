//! brewview - command-line console for a Beer Garden server.
//!
//! Logs in, shows who you are and what you may open, lists systems, and can
//! follow the live event stream.

use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use brewview_core::cache::CacheManager;
use brewview_core::console::{ConsoleState, THEMES};
use brewview_core::{ApiClient, ApiError, Config, Console, Event, TokenStore, View};

/// Subscriber key for printing events in `watch`
const PRINTER_SUBSCRIBER: &str = "cli_printer";

const USAGE: &str = "\
Usage: brewview [--ephemeral] <command> [args]

Options:
  --ephemeral        Keep tokens in memory and leave the config file untouched

Commands:
  login [username]   Log in and store the token in the OS keychain
  logout             Forget stored tokens
  whoami             Show the current user and permissions
  systems            List systems (falls back to the local cache)
  can <path>         Check whether a console view may be opened
  theme <name>       Select a theme and store it on the server
  passwd             Change the current user's password
  watch              Follow the live event stream until Ctrl-C
";

/// Initialize the tracing subscriber for logging
fn init_tracing() -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let (writer, guard) = tracing_appender::non_blocking(io::stderr());

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .init();
    guard
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _guard = init_tracing();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let ephemeral = match args.iter().position(|a| a == "--ephemeral") {
        Some(index) => {
            args.remove(index);
            true
        }
        None => false,
    };
    let Some(command) = args.first() else {
        eprint!("{}", USAGE);
        return Ok(());
    };

    let mut console = build_console(ephemeral)?;
    if let Err(e) = console.load_config().await {
        warn!(error = %format!("{:#}", e), "Could not fetch server config");
    }

    match command.as_str() {
        "login" => login(&mut console, args.get(1).cloned()).await,
        "logout" => {
            console.initial_load().await?;
            console.do_logout().await?;
            println!("Logged out");
            Ok(())
        }
        "whoami" => {
            console.initial_load().await?;
            whoami(&console);
            Ok(())
        }
        "systems" => {
            console.initial_load().await?;
            systems(&mut console).await
        }
        "can" => {
            let path = args.get(1).context("Usage: brewview can <path>")?;
            console.initial_load().await?;
            can(&mut console, path).await
        }
        "theme" => {
            let theme = args.get(1).context("Usage: brewview theme <name>")?;
            if !THEMES.contains(&theme.as_str()) {
                bail!("Unknown theme {} (available: {})", theme, THEMES.join(", "));
            }
            console.initial_load().await?;
            console.change_theme(theme, true).await?;
            println!("Theme set to {}", theme);
            Ok(())
        }
        "passwd" => {
            console.initial_load().await?;
            let current = rpassword::prompt_password("Current password: ")?;
            let new = rpassword::prompt_password("New password: ")?;
            let confirm = rpassword::prompt_password("Confirm new password: ")?;
            if new != confirm {
                bail!("Passwords do not match");
            }
            console.update_user_password(&current, &new).await?;
            println!("Password changed");
            Ok(())
        }
        "watch" => watch(&mut console).await,
        "-h" | "--help" | "help" => {
            print!("{}", USAGE);
            Ok(())
        }
        other => {
            eprint!("{}", USAGE);
            bail!("Unknown command: {}", other)
        }
    }
}

fn build_console(ephemeral: bool) -> Result<Console> {
    let mut config = Config::load()?;
    let tokens = if ephemeral {
        config = config.detached();
        TokenStore::in_memory()
    } else {
        TokenStore::keyring()
    };
    let api = ApiClient::new(&config.api_base_url)?;

    let cache = match config.cache_dir().and_then(CacheManager::new) {
        Ok(cache) => Some(cache),
        Err(e) => {
            warn!(error = %format!("{:#}", e), "Cache disabled");
            None
        }
    };

    let console = Console::new(api, tokens, config);
    Ok(match cache {
        Some(cache) => console.with_cache(cache),
        None => console,
    })
}

fn prompt_username(default: Option<&str>) -> Result<String> {
    match default {
        Some(name) => print!("Username [{}]: ", name),
        None => print!("Username: "),
    }
    io::stdout().flush()?;

    let mut username = String::new();
    io::stdin().read_line(&mut username)?;
    let username = username.trim();
    if username.is_empty() {
        return default
            .map(str::to_string)
            .context("Username required");
    }
    Ok(username.to_string())
}

async fn login(console: &mut Console, username: Option<String>) -> Result<()> {
    let username = match username {
        Some(name) => name,
        None => prompt_username(console.config().last_username.as_deref())?,
    };
    let password = rpassword::prompt_password("Password: ")?;

    if let Err(e) = console.login(&username, &password).await {
        if ApiError::is_auth_failure_in(&e) {
            bail!("Invalid username or password");
        }
        return Err(e);
    }
    info!(username = %username, "Logged in");

    println!("Login successful!");
    if console.session().pw_change_required {
        println!("A password change is required; run `brewview passwd`.");
    }
    Ok(())
}

fn whoami(console: &Console) {
    let session = console.session();
    let Some(user) = session.user() else {
        match &session.user_error {
            Some(e) => println!("Not logged in ({})", e),
            None => println!("Not logged in"),
        }
        return;
    };

    println!("{}", console.window_title(&[user.username.as_str()]));
    println!("  anonymous:        {}", session.is_anonymous);
    println!("  protected:        {}", session.is_protected);
    println!("  password change:  {}", session.pw_change_required);
    println!("  theme:            {}", console.state().themes.current().unwrap_or("-"));
    if !console.auth_enabled() {
        println!("  permissions:      all (authorization disabled)");
    } else if user.permissions.is_empty() {
        println!("  permissions:      none");
    } else {
        let permissions: Vec<&str> = user.permissions.iter().map(String::as_str).collect();
        println!("  permissions:      {}", permissions.join(", "));
    }
}

async fn can(console: &mut Console, path: &str) -> Result<()> {
    let route = console
        .resolve_route(path)
        .with_context(|| format!("Unknown view: {}", path))?;
    match &route.namespace {
        Some(namespace) => println!("{:?} in {}: {:?}", route.view, namespace, console.check_view(route.view)),
        None => println!("{:?}: {:?}", route.view, console.check_view(route.view)),
    }

    if matches!(route.view, View::SystemById | View::System | View::Command) {
        if let Err(e) = console.load_systems().await {
            warn!(error = %format!("{:#}", e), "Could not load systems");
            console.load_cached_systems()?;
        }
        match console.resolve_system(&route) {
            Some(system) => println!("  system: {}", system.display_name()),
            None => println!("  system: not found"),
        }
    }
    Ok(())
}

async fn systems(console: &mut Console) -> Result<()> {
    if let Err(e) = console.load_systems().await {
        match console.load_cached_systems()? {
            Some(cached) => {
                eprintln!("Offline ({:#}); showing cached systems from {}", e, cached.age);
                if cached.stale {
                    eprintln!("Warning: the cached catalog is stale and may be missing changes");
                }
            }
            None => return Err(e),
        }
    }

    let mut systems: Vec<_> = console.catalog().iter().collect();
    systems.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.version.cmp(&b.version)));
    for system in systems {
        println!(
            "{:<40} {:>3} commands  {}/{} running",
            system.display_name(),
            system.commands.len(),
            system.running_instances(),
            system.instances.len()
        );
    }
    Ok(())
}

async fn watch(console: &mut Console) -> Result<()> {
    console.initial_load().await?;
    if let Err(e) = console.load_systems().await {
        warn!(error = %format!("{:#}", e), "Starting with an empty catalog");
    }

    console
        .dispatcher_mut()
        .subscribe(PRINTER_SUBSCRIBER, |state: &mut ConsoleState, event: &Event| {
            match serde_json::to_string(event) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!(error = %e, "Failed to print event"),
            }
            info!(systems = state.catalog.len(), "Catalog size");
        })?;

    eprintln!("Watching events, Ctrl-C to stop");
    console
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C");
            }
        })
        .await
}
