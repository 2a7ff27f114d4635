//! Theme commands.

use super::{AppSession, CommandError};

fn label(dark_mode: bool) -> &'static str {
    if dark_mode { "dark" } else { "light" }
}

/// Print the current theme.
pub fn show(session: &AppSession) {
    tracing::info!("Theme: {}", label(session.theme().dark_mode()));
}

/// Switch between light and dark.
///
/// # Errors
///
/// Returns an error if the flag cannot be persisted.
pub async fn toggle(session: &AppSession) -> Result<(), CommandError> {
    let dark_mode = session.theme().toggle_theme().await?;
    tracing::info!("Theme: {}", label(dark_mode));
    Ok(())
}

/// Turn dark mode on or off.
///
/// # Errors
///
/// Returns an error if the flag cannot be persisted.
pub async fn set(session: &AppSession, dark_mode: bool) -> Result<(), CommandError> {
    session.theme().set_dark_mode(dark_mode).await?;
    tracing::info!("Theme: {}", label(dark_mode));
    Ok(())
}
