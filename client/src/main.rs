//! Username reservation client entry-point.
//!
//! Drives the reservation coordinator against the in-memory username directory
//! and prints the final modal snapshot as JSON.
//!
//! # Examples
//! ```sh
//! cargo run -p client -- valid_name --confirm
//! cargo run -p client -- --burst --taken taken_name val vali valid_name
//! ```
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::sync::Arc;

use chrono::TimeDelta;
use clap::Parser;
use color_eyre::eyre::{Context, Result, eyre};
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use client::config::UsernameSettings;
use client::domain::ports::SessionState;
use client::domain::{
    ConfirmOutcome, DeleteOutcome, ReserveOutcome, UsernameReservationCoordinator,
    UsernameReservationPorts,
};
use client::outbound::{InMemoryUsernameDirectory, TracingNotificationSink};

/// `client` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "client",
    about = "Reserve, confirm, and delete usernames against an in-memory directory",
    version
)]
struct CliArgs {
    /// Nicknames to reserve, in typing order. The last one is authoritative.
    #[arg(required = true, value_name = "nickname")]
    nicknames: Vec<String>,
    /// Issue every reserve concurrently so earlier ones are superseded.
    #[arg(long)]
    burst: bool,
    /// Confirm the held reservation once reserving finishes.
    #[arg(long)]
    confirm: bool,
    /// Delete the committed username at the end of the run.
    #[arg(long)]
    delete: bool,
    /// Nicknames the directory reports as unavailable.
    #[arg(long = "taken", value_name = "nickname")]
    taken: Vec<String>,
    /// Seconds a reservation stays valid.
    #[arg(long = "hold-secs", value_name = "seconds", default_value_t = 300)]
    hold_secs: i64,
    /// Seed for discriminator generation.
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let args = CliArgs::parse();
    let settings = UsernameSettings::load_from_iter([OsString::from("client")])
        .wrap_err("failed to load username settings")?;
    let limits = settings
        .nickname_limits()
        .wrap_err("invalid nickname length limits")?;
    let debounce = settings.debounce();

    let hold = TimeDelta::try_seconds(args.hold_secs)
        .ok_or_else(|| eyre!("hold duration {}s is out of range", args.hold_secs))?;
    let directory = Arc::new(
        InMemoryUsernameDirectory::new(Arc::new(DefaultClock), hold, args.seed)
            .with_taken_nicknames(args.taken.iter().cloned()),
    );
    let coordinator = Arc::new(UsernameReservationCoordinator::new(
        UsernameReservationPorts::new(
            directory.clone(),
            directory.clone(),
            Arc::new(TracingNotificationSink),
        ),
        limits,
    ));

    coordinator.open();
    if args.burst {
        let mut attempts = JoinSet::new();
        for nickname in args.nicknames {
            let coordinator = Arc::clone(&coordinator);
            attempts.spawn(async move {
                let outcome = coordinator.reserve(&nickname, debounce).await;
                (nickname, outcome)
            });
            tokio::task::yield_now().await;
        }
        while let Some(joined) = attempts.join_next().await {
            let (nickname, outcome) = joined.wrap_err("reserve task failed")?;
            log_reserve_outcome(&nickname, &outcome);
        }
    } else {
        for nickname in &args.nicknames {
            let outcome = coordinator.reserve(nickname, debounce).await;
            log_reserve_outcome(nickname, &outcome);
        }
    }

    if args.confirm {
        let outcome = coordinator.confirm().await;
        if outcome != ConfirmOutcome::Confirmed {
            warn!(?outcome, "username was not confirmed");
        }
    }
    if args.delete && coordinator.delete_username(None).await == DeleteOutcome::Failed {
        warn!("username deletion failed");
    }

    let report = serde_json::json!({
        "snapshot": coordinator.snapshot(),
        "editState": coordinator.edit_state(),
        "committedUsername": directory.committed_username(),
    });
    let rendered =
        serde_json::to_string_pretty(&report).wrap_err("failed to render snapshot")?;
    println!("{rendered}");
    Ok(())
}

fn log_reserve_outcome(nickname: &str, outcome: &ReserveOutcome) {
    match outcome {
        ReserveOutcome::Reserved(reservation) => {
            info!(%nickname, username = %reservation.username(), "reserve finished");
        }
        ReserveOutcome::Rejected(error) | ReserveOutcome::Failed(error) => {
            info!(%nickname, %error, "reserve refused");
        }
        ReserveOutcome::Superseded | ReserveOutcome::Ignored => {
            info!(%nickname, ?outcome, "reserve skipped");
        }
    }
}
