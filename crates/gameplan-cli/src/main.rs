//! gameplan - command-line client for the gameplan community API.
//!
//! Thin wrapper around `gameplan-core`: parses a subcommand, builds the
//! client against the configured API base, and prints the results.

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gameplan_core::models::{Post, ProfileUpdate, Role};
use gameplan_core::{ApiClient, Config, TokenStore};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Command-line client for the gameplan community.
#[derive(Parser, Debug)]
#[command(name = "gameplan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and store the session
    Login {
        /// Account username
        username: String,
    },

    /// Drop the stored session
    Logout,

    /// Create a new account (does not log in)
    Register {
        /// Desired username
        username: String,

        /// Contact email
        email: String,
    },

    /// Show the logged-in account
    Whoami,

    /// Show the shared feed
    Feed {
        /// Number of posts to fetch
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },

    /// Publish a post
    Post {
        /// Post text
        text: String,

        /// URL of an attached image or clip
        #[arg(long)]
        media_url: Option<String>,
    },

    /// Show your own posts
    Mine {
        /// Number of posts to fetch
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },

    /// Follow a user by id
    Follow {
        /// Id of the user to follow
        user_id: i64,
    },

    /// Stop following a user
    Unfollow {
        /// Id of the user to unfollow
        user_id: i64,
    },

    /// List the user ids you follow
    Following,

    /// Show your profile, or update the given fields
    Profile {
        /// New display name
        #[arg(long)]
        display_name: Option<String>,

        /// New bio
        #[arg(long)]
        bio: Option<String>,

        /// New role: player, coach, or fan
        #[arg(long)]
        role: Option<Role>,
    },
}

/// Initialize the tracing subscriber for logging.
/// Use RUST_LOG to control the level (e.g. RUST_LOG=debug).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env();
    debug!(api_base = %config.api_base, "starting");

    let data_dir = config.data_dir().context("no usable data directory")?;
    let store =
        Arc::new(TokenStore::open(&data_dir).context("could not open the credential store")?);
    let client = ApiClient::new(&config, store)?;

    run(cli.command, &client).await
}

async fn run(command: Command, client: &ApiClient) -> Result<()> {
    match command {
        Command::Login { username } => {
            let password = rpassword::prompt_password("Password: ")?;
            client.login(&username, &password).await?;
            let user = client.me().await?;
            println!("Logged in as {} <{}>", user.username, user.email);
        }
        Command::Logout => {
            client.logout();
            println!("Logged out.");
        }
        Command::Register { username, email } => {
            let password = rpassword::prompt_password("Password: ")?;
            client.register(&username, &email, &password).await?;
            println!("Account created. Run `gameplan login {}` to sign in.", username);
        }
        Command::Whoami => {
            let user = client.me().await?;
            println!("{} <{}> (id {})", user.username, user.email, user.id);
        }
        Command::Feed { limit } => {
            print_posts(&client.feed(limit).await?);
        }
        Command::Mine { limit } => {
            print_posts(&client.my_posts(limit).await?);
        }
        Command::Post { text, media_url } => {
            let post = client.create_post(&text, media_url.as_deref()).await?;
            println!("Posted #{}", post.id);
        }
        Command::Follow { user_id } => {
            client.follow(user_id).await?;
            println!("Following user {}", user_id);
        }
        Command::Unfollow { user_id } => {
            client.unfollow(user_id).await?;
            println!("Unfollowed user {}", user_id);
        }
        Command::Following => {
            let ids = client.following().await?;
            if ids.is_empty() {
                println!("Not following anyone yet.");
            } else {
                for id in ids {
                    println!("{}", id);
                }
            }
        }
        Command::Profile {
            display_name,
            bio,
            role,
        } => {
            let update = ProfileUpdate {
                display_name,
                bio,
                role,
            };
            let profile = if update.is_empty() {
                client.profile().await?
            } else {
                client.update_profile(&update).await?
            };
            println!("{} ({})", profile.shown_name(), profile.role);
            println!("  username: {}", profile.username);
            println!("  email:    {}", profile.email);
            if !profile.bio.is_empty() {
                println!("  bio:      {}", profile.bio);
            }
        }
    }

    Ok(())
}

fn print_posts(posts: &[Post]) {
    if posts.is_empty() {
        println!("No posts.");
        return;
    }
    for post in posts {
        println!(
            "#{} {} ({})",
            post.id,
            post.author.username,
            post.created_at.format("%Y-%m-%d %H:%M")
        );
        println!("  {}", post.text);
        if let Some(media) = post.media() {
            println!("  media: {}", media);
        }
    }
}
