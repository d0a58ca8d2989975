//! Job portal session client

use clap::Parser;
use color_eyre::Result;
use portal::storage::FileBackend;
use portal::{Origin, Resolution, SessionState};
use std::io::read_to_string;
use tracing::info;

use crate::api::{Api, Credentials, Registration};
use crate::app::App;
use crate::config::{Config, LogFormat};
use crate::opt::{Command, Opt};

mod api;
mod app;
mod config;
mod opt;

/// Initializes tracing collection
fn setup_tracing(config: config::Logging) -> Result<()> {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    let fmt_layer = match config.format {
        LogFormat::Pretty => fmt::layer().pretty().with_writer(std::io::stderr).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_writer(std::io::stderr).boxed(),
    };

    let filter_layer = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    let filter_layer = config
        .filters
        .into_iter()
        .fold(filter_layer, |layer, filter| layer.add_directive(filter));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .init();

    Ok(())
}

fn print_resolution(resolution: &Resolution) {
    for route in &resolution.redirects {
        println!("-> {route}");
    }
    println!("{} ({})", resolution.view, resolution.view.route());
}

#[tokio::main]
async fn main() -> Result<()> {
    let Opt {
        config: mut config_file,
        command,
    } = Opt::parse();

    let config = read_to_string(&mut config_file)?;
    let config: Config = toml::from_str(&config)?;

    setup_tracing(config.logging)?;
    color_eyre::install()?;

    info!(
        config = ?config_file.path().path(),
        storage = ?config.storage.path,
        "Tracing initialized, opening session storage"
    );

    let origin = Origin::new(FileBackend::open(&config.storage.path)?);
    let app = App::open(origin.context(), Api::new(&config.backend)?)?;

    match command {
        Command::Login { email, password } => {
            let resolution = app.login(&Credentials { email, password }).await?;
            print_resolution(&resolution);
        }
        Command::Register {
            user_name,
            email,
            password,
            role,
        } => {
            let registration = Registration {
                user_name,
                email,
                password,
                role,
            };
            app.register(&registration).await?;
            println!("Registered {}, log in to continue", registration.email);
        }
        Command::Roles => {
            for choice in crate::app::role_choices() {
                println!(
                    "{:<10} {:<10} {} {}",
                    choice.role.as_str(),
                    choice.label,
                    choice.color,
                    choice.dashboard
                );
            }
        }
        Command::ChooseRole { role } => print_resolution(&app.choose_role(role)?),
        Command::Logout => print_resolution(&app.logout()?),
        Command::Open { path } => print_resolution(&app.open_path(&path)),
        Command::Status => {
            let status = app.status()?;
            let name = status.profile.display_name();
            match status.session.state() {
                SessionState::AuthenticatedWithRole(role) => {
                    println!("Logged in as {name} ({}, {})", role.label(), role.color())
                }
                SessionState::AuthenticatedNoRole => println!("Logged in as {name}, no role selected"),
                SessionState::Unauthenticated => println!("Logged out"),
            }
            if let Some(user_id) = &status.session.user_id {
                println!("User id: {user_id}");
            }
            if let Some(expires_at) = status.expires_at() {
                let expired = if status.is_expired() { " (expired)" } else { "" };
                println!("Token expires at: {expires_at}{expired}");
            }
            println!("Home: {} ({})", status.view, status.view.route());
        }
    }

    info!("Done");
    Ok(())
}
