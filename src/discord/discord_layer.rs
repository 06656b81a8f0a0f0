// Discord layer - commands and event handlers.

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "events.rs"]
pub mod events;

#[path = "membership.rs"]
pub mod membership;

#[path = "reports.rs"]
pub mod reports;

use std::sync::Arc;

use poise::serenity_prelude as serenity;

use crate::core::logging::EventLogService;
use crate::core::stages::StageReportService;
use crate::infra::logging::sqlite_event_store::SqliteEventLogStore;
use crate::infra::splatoon::api_client::Splatoon3ApiClient;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared state handed to every command and event handler. Constructed once
/// in main; the log store lives and dies with this session.
pub struct Data {
    pub logs: Arc<EventLogService<SqliteEventLogStore>>,
    pub stage_reports: Arc<StageReportService<Splatoon3ApiClient>>,
    pub guild_id: serenity::GuildId,
    pub report_channel_id: serenity::ChannelId,
    pub admin_role_id: serenity::RoleId,
}
