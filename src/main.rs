//! EventHub mirror tool
//!
//! Connects to the configured backend, mirrors the events table, follows its
//! change feed and logs every reconciled change until Ctrl-C.

use tracing::{error, info, warn};

use eventhub::{
    config::Settings,
    store::views::{category_counts, status_counts},
    utils::logging,
    AppContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up a local .env before reading EVENTHUB__* variables
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;
    settings.validate()?;

    // Initialize logging; the guard flushes the log file on exit
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", eventhub::info());

    let context = AppContext::connect(settings)?;
    let events = context.events().clone();

    match context.auth().init().await {
        Ok(state) => match (state.user, state.profile) {
            (Some(user), Some(profile)) => info!(
                user_id = %user.id,
                name = %profile.display_name(),
                admin = profile.is_admin(),
                "Using restored session"
            ),
            (Some(user), None) => info!(user_id = %user.id, "Using restored session without a profile"),
            (None, _) => info!("No session, reading as anonymous client"),
        },
        Err(e) => warn!(error = %e, "Could not restore session"),
    }

    let initial = events.fetch_events(None).await?;
    let statuses = status_counts(&initial);
    info!(
        total = initial.len(),
        pending = statuses.pending,
        approved = statuses.approved,
        rejected = statuses.rejected,
        "Fetched events"
    );
    for (category, count) in category_counts(&initial) {
        info!(category = %category, count = count, "Events per category");
    }

    let subscription = events.subscribe_to_events().await?;
    let mut updates = events.watch();
    let mut notices = context.notifications().subscribe();
    let mut liveness = tokio::time::interval(std::time::Duration::from_secs(5));

    info!("Following event changes, press Ctrl-C to stop");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    warn!("Event store closed");
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                info!(total = snapshot.len(), loading = snapshot.is_loading(), "Event projection changed");
                if let Some(message) = snapshot.error() {
                    error!(error = %message, "Event store reported an error");
                }
            }
            _ = liveness.tick() => {
                if let Err(e) = subscription.ensure_active() {
                    error!(error = %e, "Change feed stopped unexpectedly");
                    return Err(e.into());
                }
            }
            notice = notices.recv() => {
                if let Ok(notice) = notice {
                    info!(level = %notice.level, message = %notice.message, "Notice");
                }
            }
        }
    }

    subscription.unsubscribe().await?;
    let stats = context.notifications().stats();
    info!(
        success = stats.total_success,
        error = stats.total_error,
        info = stats.total_info,
        "Notices published this run"
    );
    info!("{} has been shut down.", eventhub::NAME);

    Ok(())
}
