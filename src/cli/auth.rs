//! CLI auth command handlers for login, logout, status, and refresh.

use std::io::Write;

use chrono::Utc;

use crate::error::{ClientError, Result};
use crate::types::LoginRequest;

use super::{Context, LoginArgs};

/// Handle `aichat auth login <username>`.
pub async fn handle_login(context: &Context, args: LoginArgs) -> Result<()> {
    let password = match args.password {
        Some(password) => password,
        None => prompt_password()?,
    };
    let response = context
        .session
        .login(&LoginRequest::new(args.username, password))
        .await?;
    println!("✅ Logged in as {}", response.user.username);
    Ok(())
}

/// Handle `aichat auth logout`.
pub async fn handle_logout(context: &Context) -> Result<()> {
    context.session.logout().await?;
    println!("Logged out");
    Ok(())
}

/// Handle `aichat auth status`.
pub async fn handle_status(context: &Context) -> Result<()> {
    let credentials = context.client().tokens().read();
    if !credentials.is_authenticated() {
        println!("Not logged in");
        return Ok(());
    }

    match credentials.access_claims() {
        Ok(claims) => {
            if let Some(user_id) = &claims.user_id {
                println!("User ID:  {user_id}");
            }
            match claims.expires_at() {
                Some(exp) if claims.is_expired_at(Utc::now()) => {
                    println!("Access:   expired at {exp}")
                }
                Some(exp) => println!("Access:   valid until {exp}"),
                None => println!("Access:   no expiry claim"),
            }
        }
        Err(err) => println!("Access:   unreadable ({err})"),
    }
    println!(
        "Refresh:  {}",
        if credentials.refresh_token.is_some() {
            "stored"
        } else {
            "missing"
        }
    );

    if context.session.is_token_valid().await {
        println!("Server:   ✅ accepted ({})", context.session.username());
    } else {
        println!("Server:   ❌ rejected");
    }
    Ok(())
}

/// Handle `aichat auth refresh`.
pub async fn handle_refresh(context: &Context) -> Result<()> {
    context.session.refresh_access_token().await?;
    println!("✅ Access token refreshed");
    Ok(())
}

fn prompt_password() -> Result<String> {
    print!("Password: ");
    std::io::stdout().flush()?;
    let mut password = String::new();
    std::io::stdin().read_line(&mut password)?;
    let password = password.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err(ClientError::InvalidArgument("no password provided".into()));
    }
    Ok(password)
}
