//! Grocer CLI - drive a storefront session from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Create an account, then sign in (stores the token under GROCER_STATE_DIR)
//! grocer register -n "Maria Lima" -e maria@example.com -p 'feira#2024'
//! grocer login -e maria@example.com -p 'feira#2024'
//!
//! # Cart aggregate, lines and mutations
//! grocer cart show
//! grocer cart list
//! grocer cart add 65a1f3c9e4 -q 2
//! grocer cart quantity 65a1f3c9e4 3
//! grocer cart remove 65a1f3c9e4
//! grocer cart clear
//!
//! # Favorites
//! grocer favorites list
//! grocer favorites toggle 65a1f3c9e4
//!
//! # Theme, search and profile
//! grocer theme toggle
//! grocer search "arroz integral"
//! grocer recent list
//! grocer profile update --phone "(11) 98765-4321"
//! ```
//!
//! # Commands
//!
//! - `register` - Create an account
//! - `login` / `logout` - Manage the stored session
//! - `cart` - Show the cart aggregate and lines, or change them
//! - `favorites` - List, toggle or re-sync favorites
//! - `theme` - Show or change the dark-mode flag
//! - `search` - Search the catalog
//! - `recent` - List or edit recently opened search results
//! - `profile` - Show or edit the user profile

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use commands::App;
use secrecy::SecretString;

mod commands;

#[derive(Parser)]
#[command(name = "grocer")]
#[command(author, version, about = "Grocer storefront client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Register {
        /// Full name
        #[arg(short, long)]
        name: String,

        /// Account email address
        #[arg(short, long)]
        email: String,

        /// New password (8+ characters with a letter, a digit and one of @$!%*#?&)
        #[arg(short, long, env = "GROCER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign in and store the session token
    Login {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "GROCER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Inspect or change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage favorites
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
    /// Show or change the theme
    Theme {
        #[command(subcommand)]
        action: ThemeAction,
    },
    /// Search the catalog
    Search {
        /// Search text
        query: String,
    },
    /// Recently opened search results
    Recent {
        #[command(subcommand)]
        action: RecentAction,
    },
    /// Show or edit the user profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show item count and total
    Show,
    /// List every line with its subtotal
    List,
    /// Add a product to the cart
    Add {
        /// Product ID
        product: String,

        /// Number of units
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set the units of a product already in the cart
    Quantity {
        /// Product ID
        product: String,

        /// New number of units
        quantity: u32,
    },
    /// Remove a product from the cart
    Remove {
        /// Product ID
        product: String,
    },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum RecentAction {
    /// List recently opened products
    List,
    /// Record a product as opened from search
    Add {
        /// Product ID
        product: String,
    },
    /// Forget a recently opened product
    Remove {
        /// Product ID
        product: String,
    },
}

#[derive(Subcommand)]
enum FavoritesAction {
    /// List favorited product IDs
    List,
    /// Favorite or unfavorite a product
    Toggle {
        /// Product ID
        product: String,
    },
    /// Drop local favorites and hydrate again from the server
    Sync,
}

#[derive(Subcommand)]
enum ThemeAction {
    /// Show the current theme
    Show,
    /// Switch between light and dark
    Toggle,
    /// Turn dark mode on or off
    Set {
        /// `on` or `off`
        #[arg(value_parser = parse_switch, action = clap::ArgAction::Set)]
        dark_mode: bool,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Show the profile
    Show,
    /// Change one or more fields
    Update {
        /// New first name
        #[arg(long)]
        given_name: Option<String>,

        /// New last name
        #[arg(long)]
        family_name: Option<String>,

        /// New CPF (empty to clear)
        #[arg(long)]
        cpf: Option<String>,

        /// New phone with area code (empty to clear)
        #[arg(long)]
        phone: Option<String>,
    },
}

fn parse_switch(raw: &str) -> Result<bool, String> {
    match raw.to_ascii_lowercase().as_str() {
        "on" | "dark" | "true" => Ok(true),
        "off" | "light" | "false" => Ok(false),
        other => Err(format!("expected 'on' or 'off', got '{other}'")),
    }
}

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "grocer=info,grocer_client=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    let App { session, config } = commands::connect().await?;
    let session = &session;

    match cli.command {
        Commands::Register {
            name,
            email,
            password,
        } => {
            commands::auth::register(session, &name, &email, &SecretString::from(password)).await?;
        }
        Commands::Login { email, password } => {
            commands::auth::login(session, &email, &SecretString::from(password)).await?;
        }
        Commands::Logout => commands::auth::logout(session).await?,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(session),
            CartAction::List => commands::cart::list(session).await?,
            CartAction::Add { product, quantity } => {
                commands::cart::add(session, &product, quantity).await?;
            }
            CartAction::Quantity { product, quantity } => {
                commands::cart::quantity(session, &product, quantity).await?;
            }
            CartAction::Remove { product } => commands::cart::remove(session, &product).await?,
            CartAction::Clear => commands::cart::clear(session).await?,
        },
        Commands::Favorites { action } => match action {
            FavoritesAction::List => commands::favorites::list(session),
            FavoritesAction::Toggle { product } => {
                commands::favorites::toggle(session, &product).await?;
            }
            FavoritesAction::Sync => commands::favorites::sync(session).await,
        },
        Commands::Theme { action } => match action {
            ThemeAction::Show => commands::theme::show(session),
            ThemeAction::Toggle => commands::theme::toggle(session).await?,
            ThemeAction::Set { dark_mode } => commands::theme::set(session, dark_mode).await?,
        },
        Commands::Search { query } => {
            commands::search::run(session, &query, config.search_debounce).await?;
        }
        Commands::Recent { action } => match action {
            RecentAction::List => commands::search::recent(session).await?,
            RecentAction::Add { product } => commands::search::open(session, &product).await?,
            RecentAction::Remove { product } => {
                commands::search::forget(session, &product).await?;
            }
        },
        Commands::Profile { action } => match action {
            ProfileAction::Show => commands::profile::show(session).await?,
            ProfileAction::Update {
                given_name,
                family_name,
                cpf,
                phone,
            } => {
                let edits = commands::profile::Edits {
                    given_name,
                    family_name,
                    cpf,
                    phone,
                };
                commands::profile::update(session, edits).await?;
            }
        },
    }
    Ok(())
}
