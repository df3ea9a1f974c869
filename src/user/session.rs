use anyhow::Result;

use crate::api::{delete_cookie, save_cookie, DojoClient};
use crate::app::Config;
use crate::utils::{fail, input_required, paint, password, success};

/// Log in with a password and keep the session cookie for later runs
pub async fn login(
    config: &Config,
    client: &DojoClient,
    username: Option<&str>,
    secret: Option<&str>,
) -> Result<()> {
    let username = match username.filter(|name| !name.is_empty()) {
        Some(name) => name.to_string(),
        None => input_required("Enter username or email: ")?,
    };
    let secret = match secret.filter(|secret| !secret.is_empty()) {
        Some(secret) => secret.to_string(),
        None => loop {
            let entered = password("Enter password: ", &config.echo_char)?;
            if !entered.is_empty() {
                break entered;
            }
        },
    };

    match client.login(&username, &secret).await? {
        Some(session) => {
            save_cookie(&config.cookie_file(), &session)?;
            tracing::debug!("Saved session cookie to {}", config.cookie_file().display());
            success(format!("Logged in as user {}!", paint("bold green", &username)));
        }
        None => fail("Login failed."),
    }
    Ok(())
}

pub fn logout(config: &Config) -> Result<()> {
    delete_cookie(&config.cookie_file())?;
    success("You have logged out.");
    Ok(())
}
