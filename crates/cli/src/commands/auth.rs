//! Sign-in and sign-out.

use secrecy::SecretString;

use super::{AppSession, CommandError};

/// Create an account; the user signs in separately.
///
/// # Errors
///
/// Returns an error if the name, email or password is invalid, or the
/// server rejects the account.
pub async fn register(
    session: &AppSession,
    full_name: &str,
    email: &str,
    password: &SecretString,
) -> Result<(), CommandError> {
    session.register(full_name, email, password).await?;
    tracing::info!("Account created for {}. Sign in with `grocer login`.", email.trim());
    Ok(())
}

/// Sign in and hydrate the session.
///
/// # Errors
///
/// Returns an error if the email is invalid, the credentials are rejected,
/// or the token cannot be stored.
pub async fn login(
    session: &AppSession,
    email: &str,
    password: &SecretString,
) -> Result<(), CommandError> {
    session.login(email, password).await?;

    let cart = session.cart().cart_info();
    tracing::info!(
        "Signed in as {}. Cart: {} item(s), {}. Favorites: {}",
        email.trim(),
        cart.item_count,
        cart.total(),
        session.favorites().favorites().len()
    );
    Ok(())
}

/// Forget the stored token and account state.
///
/// # Errors
///
/// Returns an error if the state file cannot be updated.
pub async fn logout(session: &AppSession) -> Result<(), CommandError> {
    session.logout().await?;
    tracing::info!("Signed out");
    Ok(())
}
