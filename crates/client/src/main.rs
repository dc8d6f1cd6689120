//! Command-line entry point: restores (or opens) a session and prints a
//! summary of users and roles.

use anyhow::Context;

use jadmin_client::{AppState, ClientConfig, SessionRestore, report_error};
use jadmin_core::LoginRequest;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    jadmin_observability::init();

    let config = ClientConfig::from_env().context("invalid client configuration")?;
    let app = AppState::production(config).context("failed to open session storage")?;

    match app.session.initialize()? {
        SessionRestore::Restored => tracing::info!("using saved session"),
        SessionRestore::Empty => tracing::info!("no saved session"),
        SessionRestore::Discarded(err) => tracing::warn!(error = %err, "saved session discarded"),
    }

    if !app.session.is_authenticated() {
        let username = std::env::var("JADMIN_USERNAME").context("JADMIN_USERNAME is required to sign in")?;
        let password = std::env::var("JADMIN_PASSWORD").context("JADMIN_PASSWORD is required to sign in")?;
        app.session
            .login(&LoginRequest::new(username, password))
            .await
            .context("login failed")?;
    }

    let notifier = jadmin_client::TracingNotifier;

    match app.users.fetch_users().await {
        Ok(page) => {
            println!("users ({}):", page.total);
            for user in &page.users {
                let state = if user.status { "active" } else { "disabled" };
                println!("  #{:<5} {:<20} {:<8} {state}", user.id, user.username, user.role);
            }
        }
        Err(err) => report_error(&notifier, &err),
    }

    match app.roles.fetch_roles().await {
        Ok(page) => {
            println!("roles ({}):", page.total);
            for role in &page.roles {
                println!("  #{:<5} {:<20} {} permission(s)", role.id, role.name, role.permissions.len());
            }
        }
        Err(err) => report_error(&notifier, &err),
    }

    app.session.stop_probe();
    Ok(())
}
