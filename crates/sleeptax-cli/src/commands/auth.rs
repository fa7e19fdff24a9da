use clap::Subcommand;
use sleeptax_core::{CoreError, SessionConfig};

use crate::common::{engine, load_config, print_json, CmdResult};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Sign in as a user and store their profile
    Login {
        /// Stable user id
        #[arg(long)]
        user_id: String,
        /// Display name
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        avatar_url: Option<String>,
    },
    /// Sign out and forget the selected group
    Logout,
    /// Show the signed-in user
    Whoami,
}

pub fn run(action: AuthAction) -> CmdResult {
    match action {
        AuthAction::Login {
            user_id,
            name,
            email,
            avatar_url,
        } => {
            let mut config = load_config()?;
            config.session = SessionConfig {
                user_id: Some(user_id),
                name: Some(name),
                email,
                avatar_url,
                group_id: None,
            };
            let user = engine(&config)?.ensure_profile()?;
            config.save().map_err(CoreError::from)?;
            print_json(&user)?;
        }
        AuthAction::Logout => {
            let mut config = load_config()?;
            config.session = SessionConfig::default();
            config.save().map_err(CoreError::from)?;
            println!("signed out");
        }
        AuthAction::Whoami => {
            let config = load_config()?;
            let user = config.session.user().ok_or(CoreError::NotAuthenticated)?;
            print_json(&user)?;
        }
    }
    Ok(())
}
