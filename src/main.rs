// This is the entry point of the stagekeeper Discord bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (event-log database, schedule API)
// - `discord/` = Discord-specific adapters (commands, events, delivery)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands, event handlers and the scheduled batch jobs

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use std::sync::Arc;

use poise::serenity_prelude as serenity;

use crate::core::clock::zoned_now;
use crate::core::inactivity::{format_inactive_report, InactivityDetector};
use crate::core::logging::EventLogService;
use crate::core::schedule::{run_batch_job, BatchSchedule};
use crate::core::stages::StageReportService;
use crate::discord::membership::PruneCountGauge;
use crate::discord::{events, reports, Data, Error};
use crate::infra::logging::sqlite_event_store::SqliteEventLogStore;
use crate::infra::splatoon::api_client::Splatoon3ApiClient;

/// Day threshold used by the scheduled inactivity sweep (the `/inactives`
/// command takes its own threshold).
const SWEEP_INACTIVE_DAYS: u8 = 7;

/// Event handler for non-command Discord events. Pass-through: qualifying
/// events are forwarded to the event log; failures are reported and the
/// session keeps running.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            if let Err(err) = events::handle_message(ctx, data, new_message).await {
                tracing::error!("failed to log message: {err:#}");
            }
        }
        serenity::FullEvent::MessageUpdate {
            old_if_available,
            new: _,
            event,
        } => {
            if let Err(err) =
                events::handle_message_update(ctx, data, old_if_available.as_ref(), event).await
            {
                tracing::error!("failed to log message edit: {err:#}");
            }
        }
        serenity::FullEvent::MessageDelete {
            channel_id,
            deleted_message_id,
            guild_id: _,
        } => {
            if let Err(err) =
                events::handle_message_delete(ctx, data, *channel_id, *deleted_message_id).await
            {
                tracing::error!("failed to log message delete: {err:#}");
            }
        }
        serenity::FullEvent::MessageDeleteBulk {
            channel_id,
            multiple_deleted_messages_ids,
            guild_id: _,
        } => {
            if let Err(err) = events::handle_message_delete_bulk(
                ctx,
                data,
                *channel_id,
                multiple_deleted_messages_ids,
            )
            .await
            {
                tracing::error!("failed to log bulk delete: {err:#}");
            }
        }
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            if let Err(err) = events::handle_member_join(ctx, data, new_member).await {
                tracing::error!("failed to handle member join: {err:#}");
            }
        }
        serenity::FullEvent::VoiceStateUpdate { old, new } => {
            if let Err(err) =
                events::handle_voice_state_update(ctx, data, old.as_ref(), new).await
            {
                tracing::error!("failed to handle voice state update: {err:#}");
            }
        }
        _ => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let token = std::env::var("DISCORD_TOKEN").expect(
        "Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.",
    );
    let guild_id = serenity::GuildId::new(env_id("DISCORD_GUILD_ID"));
    let report_channel_id = serenity::ChannelId::new(env_id("REPORT_CHANNEL_ID"));
    let admin_role_id = serenity::RoleId::new(env_id("ADMIN_ROLE_ID"));

    // Keep runtime databases and report images in a dedicated folder so the
    // repo root stays tidy.
    let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    // One append-only log store per run, named from the session start time.
    let session_started = zoned_now();
    let log_store = SqliteEventLogStore::open_for_run(&data_dir, session_started)
        .await
        .expect("Failed to open the event log store");
    let logs = Arc::new(EventLogService::new(log_store));

    let schedule_client = Splatoon3ApiClient::new().expect("Failed to create schedule API client");
    let stage_reports = Arc::new(StageReportService::new(schedule_client, &data_dir));

    // Create the data structure that will be shared across all commands
    let data = Data {
        logs: Arc::clone(&logs),
        stage_reports: Arc::clone(&stage_reports),
        guild_id,
        report_channel_id,
        admin_role_id,
    };

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================
    // Configure the poise framework with our commands and settings.

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::GUILD_VOICE_STATES;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            // Register all our commands here
            commands: vec![
                discord::commands::voice_limit::limit(),
                discord::commands::inactivity::inactives(),
                discord::commands::ping::ping(),
            ],
            // Event handler for messages and other events
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                // This bot serves a single configured guild, so register the
                // commands there; propagation is immediate.
                poise::builtins::register_in_guild(ctx, &framework.options().commands, guild_id)
                    .await?;

                tracing::info!(%guild_id, %report_channel_id, "stagekeeper is ready");

                // Scheduled batch jobs. Started once here; each lives for the
                // whole session and polls the wall clock once a minute.

                let battle_http = ctx.http.clone();
                let battle_reports = Arc::clone(&data.stage_reports);
                tokio::spawn(run_batch_job(
                    "stage-report",
                    BatchSchedule::new(["09:00", "17:00"])?,
                    move || {
                        let http = battle_http.clone();
                        let service = Arc::clone(&battle_reports);
                        async move {
                            tracing::info!("building battle stage report");
                            let Some(report) = service.build_battle_report(zoned_now()).await?
                            else {
                                tracing::warn!("no battle rotation covers the current time");
                                return Ok(());
                            };
                            reports::send_report(&http, report_channel_id, report).await
                        }
                    },
                ));

                // Offset from the battle report so the two posts don't land
                // at the same minute (and skip midnight entirely).
                let salmon_http = ctx.http.clone();
                let salmon_reports = Arc::clone(&data.stage_reports);
                tokio::spawn(run_batch_job(
                    "salmon-report",
                    BatchSchedule::new(["09:30", "17:30"])?,
                    move || {
                        let http = salmon_http.clone();
                        let service = Arc::clone(&salmon_reports);
                        async move {
                            tracing::info!("building salmon run report");
                            let Some(report) = service.build_salmon_report(zoned_now()).await?
                            else {
                                tracing::warn!("no salmon run rotation covers the current time");
                                return Ok(());
                            };
                            reports::send_report(&http, report_channel_id, report).await
                        }
                    },
                ));

                let sweep_http = ctx.http.clone();
                tokio::spawn(run_batch_job(
                    "inactivity-sweep",
                    BatchSchedule::new(["09:34", "12:00", "21:00"])?,
                    move || {
                        let http = sweep_http.clone();
                        async move {
                            let detector = InactivityDetector::new(PruneCountGauge::new(
                                http.clone(),
                                guild_id,
                            ));
                            match detector.detect(SWEEP_INACTIVE_DAYS).await? {
                                Some(count) if count > 0 => {
                                    report_channel_id
                                        .say(
                                            &http,
                                            format_inactive_report(SWEEP_INACTIVE_DAYS, count),
                                        )
                                        .await?;
                                }
                                Some(_) => {}
                                None => tracing::warn!(
                                    "membership service returned no inactivity estimate"
                                ),
                            }
                            Ok(())
                        }
                    },
                ));

                Ok(data)
            })
        })
        .build();

    // Create the client and start the bot. A large message cache keeps
    // edit/delete logging reliable.
    let mut settings = serenity::cache::Settings::default();
    settings.max_messages = 10000;

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .cache_settings(settings)
        .await
        .expect("Error creating client");

    client.start().await.expect("Error running bot");
}

fn env_id(name: &str) -> u64 {
    std::env::var(name)
        .unwrap_or_else(|_| panic!("Missing {name} environment variable!"))
        .parse()
        .unwrap_or_else(|_| panic!("{name} must be a numeric Discord ID"))
}
