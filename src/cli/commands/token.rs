use clap::Subcommand;
use serde_json::json;

use crate::auth::MagicTokenService;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::mail::transport_from_config;
use crate::services::LinkDispatcher;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Issue a magic link token for an email address")]
    Issue {
        #[arg(help = "Email address the token is bound to")]
        email: String,
    },

    #[command(about = "Verify a token and print the email it is bound to")]
    Verify {
        #[arg(help = "Token to verify")]
        token: String,
    },

    #[command(about = "Print a complete verification link without sending it")]
    Link {
        #[arg(help = "Email address the link signs in")]
        email: String,
        #[arg(long, help = "Page to land on after verification")]
        next: Option<String>,
    },

    #[command(about = "Build a verification link and send it through the configured transport")]
    Send {
        #[arg(help = "Email address to send the link to")]
        email: String,
        #[arg(long, help = "Page to land on after verification")]
        next: Option<String>,
    },
}

pub async fn handle(
    cmd: TokenCommands,
    config: &AppConfig,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let tokens = MagicTokenService::from_config(&config.magic_link);

    match cmd {
        TokenCommands::Issue { email } => {
            let token = tokens.issue(&email)?;
            output_success(
                output_format,
                &format!("Token issued for {} (valid {} minutes)", email, tokens.ttl().num_minutes()),
                &token,
                json!({ "email": email, "token": token }),
            )
        }
        TokenCommands::Verify { token } => {
            let email = tokens.verify(&token)?;
            output_success(
                output_format,
                "Token verified",
                &email,
                json!({ "email": email }),
            )
        }
        TokenCommands::Link { email, next } => {
            let dispatcher = LinkDispatcher::new(config, transport_from_config(&config.mail)?);
            let token = tokens.issue(&email)?;
            let link = dispatcher.verification_url(&token, next.as_deref());
            output_success(
                output_format,
                &format!("Magic link created for {}", email),
                &link,
                json!({ "email": email, "link": link }),
            )
        }
        TokenCommands::Send { email, next } => {
            let dispatcher = LinkDispatcher::new(config, transport_from_config(&config.mail)?);
            let token = tokens.issue(&email)?;
            let link = dispatcher.verification_url(&token, next.as_deref());
            dispatcher.dispatch(&email, &link).await?;
            output_success(
                output_format,
                &format!("Magic link sent to {}", email),
                &link,
                json!({ "email": email, "link": link }),
            )
        }
    }
}
