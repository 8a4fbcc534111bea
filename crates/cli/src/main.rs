//! RAFAL CLI - drive the storefront checkout from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Buy one product, cash on delivery
//! rafal buy 3 --quantity 2 --first-name Omar --last-name Hassan \
//!     --phone 01012345678 --city Giza --region Dokki --address "5 Nile St"
//!
//! # Check out a cart and pay by card through Fawry
//! rafal checkout --item 3x2@#FF0000 --item 5 --payment card --provider fawry ...
//!
//! # Verify a gateway payment
//! rafal verify pay_123
//!
//! # Inspect advertisements
//! rafal ads list
//! rafal ads ping
//! ```
//!
//! Results are printed to stdout as JSON; logs go to stderr.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rafal_core::{OrderId, PaymentProvider, ProductId};
use rafal_storefront::AppState;
use rafal_storefront::config::StorefrontConfig;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{BuyerArgs, CliError, PaymentArgs};

#[derive(Parser)]
#[command(name = "rafal")]
#[command(author, version, about = "RAFAL storefront checkout tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Buy a single product directly
    Buy {
        /// Product id
        product_id: ProductId,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        /// Colour as `#RRGGBB`; defaults to the product's first colour
        #[arg(long)]
        color: Option<String>,

        #[command(flatten)]
        buyer: BuyerArgs,

        #[command(flatten)]
        payment: PaymentArgs,
    },
    /// Check out a list of cart lines
    Checkout {
        /// Cart line as `PRODUCT[xQTY][@#RRGGBB]`, repeatable
        #[arg(short, long = "item", value_parser = commands::order::parse_item)]
        items: Vec<rafal_storefront::api::OrderItem>,

        #[command(flatten)]
        buyer: BuyerArgs,

        #[command(flatten)]
        payment: PaymentArgs,
    },
    /// Request the payment gateway hand-off for an existing order
    Pay {
        order_id: OrderId,

        /// Gateway: fawry, aman or paymob
        #[arg(long, default_value = "paymob")]
        provider: PaymentProvider,
    },
    /// Verify the outcome of a gateway payment
    Verify { payment_id: String },
    /// Order history
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Promotional banners
    Ads {
        #[command(subcommand)]
        action: AdsAction,
    },
    /// Stored buyer session
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List the logged-in buyer's orders
    List,
    /// Show one order
    Show { order_id: OrderId },
}

#[derive(Subcommand)]
enum AdsAction {
    /// Fetch the active banners (cache and fallbacks apply)
    List,
    /// Clear the cache and fetch again
    Refresh,
    /// Test connectivity to the ads host
    Ping,
}

#[derive(Subcommand)]
enum SessionAction {
    /// Store a bearer token
    Login { token: String },
    /// Forget the token and cart session
    Logout,
    /// Show session status
    Show,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "rafal_storefront=info,rafal_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing();
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    if let Err(e) = run(cli, config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), CliError> {
    let state = AppState::new(config)?;

    match cli.command {
        Commands::Buy {
            product_id,
            quantity,
            color,
            buyer,
            payment,
        } => {
            commands::order::buy(&state, product_id, quantity, color.as_deref(), buyer, payment)
                .await
        }
        Commands::Checkout {
            items,
            buyer,
            payment,
        } => commands::order::checkout(&state, items, buyer, payment).await,
        Commands::Pay { order_id, provider } => {
            commands::payment::pay(&state, order_id, provider).await
        }
        Commands::Verify { payment_id } => commands::payment::verify(&state, &payment_id).await,
        Commands::Orders { action } => match action {
            OrdersAction::List => commands::order::list(&state).await,
            OrdersAction::Show { order_id } => commands::order::show(&state, order_id).await,
        },
        Commands::Ads { action } => match action {
            AdsAction::List => commands::ads::list(&state).await,
            AdsAction::Refresh => commands::ads::refresh(&state).await,
            AdsAction::Ping => commands::ads::ping(&state).await,
        },
        Commands::Session { action } => match action {
            SessionAction::Login { token } => commands::session::login(&state, &token),
            SessionAction::Logout => commands::session::logout(&state),
            SessionAction::Show => commands::session::show(&state),
        },
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_checkout_items() {
        let cli = Cli::try_parse_from([
            "rafal", "checkout", "--item", "3x2@#ff0000", "--item", "5", "--first-name", "Omar",
            "--last-name", "Hassan", "--phone", "01012345678", "--city", "Giza", "--region",
            "Dokki", "--address", "5 Nile St", "--payment", "card", "--provider", "aman",
        ]);
        let Ok(Cli {
            command: Commands::Checkout { items, payment, .. },
        }) = cli
        else {
            panic!("checkout did not parse");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[1].quantity, 1);
        assert_eq!(payment.provider, Some(PaymentProvider::Aman));
    }
}
