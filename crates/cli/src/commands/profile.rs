//! Profile commands.

use grocer_client::ProfileDraft;
use grocer_core::{Cpf, Phone};

use super::{AppSession, CommandError};

/// Field edits from the command line; `None` leaves a field unchanged.
#[derive(Debug, Default)]
pub struct Edits {
    /// New first name.
    pub given_name: Option<String>,
    /// New last name.
    pub family_name: Option<String>,
    /// New CPF, any punctuation.
    pub cpf: Option<String>,
    /// New phone, any punctuation.
    pub phone: Option<String>,
}

/// Print the profile.
///
/// # Errors
///
/// Returns an error if not signed in or the request fails.
pub async fn show(session: &AppSession) -> Result<(), CommandError> {
    let profile = session.profile().await?;
    tracing::info!("Name:  {} {}", profile.given_name, profile.family_name);
    tracing::info!("Email: {}", profile.email);
    tracing::info!("CPF:   {}", or_unset(&Cpf::format_partial(&profile.cpf)));
    tracing::info!("Phone: {}", or_unset(&Phone::format_partial(&profile.number)));
    Ok(())
}

/// Apply `edits` and send only the fields that changed.
///
/// # Errors
///
/// Returns an error if a field is invalid, nothing changed, or the request
/// fails.
pub async fn update(session: &AppSession, edits: Edits) -> Result<(), CommandError> {
    let profile = session.profile().await?;
    let mut draft = ProfileDraft::from_profile(&profile);
    if let Some(given_name) = edits.given_name {
        draft.given_name = given_name;
    }
    if let Some(family_name) = edits.family_name {
        draft.family_name = family_name;
    }
    if let Some(cpf) = edits.cpf {
        draft.cpf = Cpf::format_partial(&cpf);
    }
    if let Some(phone) = edits.phone {
        draft.phone = Phone::format_partial(&phone);
    }

    let update = session.update_profile(&draft, &profile).await?;
    let fields: Vec<&str> = [
        update.given_name.as_ref().map(|_| "name"),
        update.family_name.as_ref().map(|_| "family name"),
        update.cpf.as_ref().map(|_| "CPF"),
        update.number.as_ref().map(|_| "phone"),
    ]
    .into_iter()
    .flatten()
    .collect();
    tracing::info!("Updated {}", fields.join(", "));
    Ok(())
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() { "(not set)" } else { value }
}
