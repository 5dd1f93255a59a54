use crate::cli::Cli;
use crate::commands::{CommandError, Result, Runtime};
use crate::output::{format_output, OutputData, TokenStatus};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::io::{self, BufRead, Write};

pub async fn login(cli: &Cli, username: Option<&str>, password: Option<&str>) -> Result<()> {
    let runtime = Runtime::load()?;

    let username = match username {
        Some(u) => u.to_string(),
        None => prompt_line("Username: ")?,
    };
    let password = match password {
        Some(p) => p.to_string(),
        None => rpassword::prompt_password("Password: ")?,
    };
    if username.trim().is_empty() || password.is_empty() {
        return Err(CommandError::InvalidInput(
            "username and password are required".to_string(),
        ));
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("Requesting credential from {}...", runtime.credentials.token_endpoint()));
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let issued = runtime.credentials.issue(username.trim(), &password).await;
    spinner.finish_and_clear();
    let token = issued?;

    let message = match token.expires_at() {
        Some(at) => format!("Logged in; credential expires {}", at.to_rfc3339()),
        None => "Logged in; credential carries no readable expiry".to_string(),
    };
    match cli.output {
        crate::cli::OutputFormat::Pretty => println!("{} {}", "✓".green(), message.green()),
        _ => format_output(&OutputData::Token(status(&runtime)), &cli.output)?,
    }
    Ok(())
}

pub async fn logout(cli: &Cli) -> Result<()> {
    let runtime = Runtime::load()?;
    runtime.credentials.invalidate()?;
    format_output(
        &OutputData::Message("Stored credential removed".to_string()),
        &cli.output,
    )
}

pub async fn token(cli: &Cli) -> Result<()> {
    let runtime = Runtime::load()?;
    format_output(&OutputData::Token(status(&runtime)), &cli.output)
}

fn status(runtime: &Runtime) -> TokenStatus {
    let manager = &runtime.credentials;
    let endpoint = manager.token_endpoint().to_string();
    match manager.current_token() {
        Some(token) => TokenStatus {
            present: true,
            valid: !manager.is_expired(&token),
            issued_at: Some(token.issued_at().to_rfc3339()),
            expires_at: token.expires_at().map(|at| at.to_rfc3339()),
            age_days: Some(manager.age_in_days(&token)),
            endpoint,
        },
        None => TokenStatus {
            present: false,
            valid: false,
            issued_at: None,
            expires_at: None,
            age_days: None,
            endpoint,
        },
    }
}

fn prompt_line(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
