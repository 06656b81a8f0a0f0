use std::sync::Arc;

use async_trait::async_trait;
use poise::serenity_prelude as serenity;

use crate::core::inactivity::{InactivityError, MembershipGauge};

/// Membership gauge backed by Discord's prune-count endpoint: counts members
/// with no activity inside the window and no roles keeping them.
pub struct PruneCountGauge {
    http: Arc<serenity::Http>,
    guild_id: serenity::GuildId,
}

impl PruneCountGauge {
    pub fn new(http: Arc<serenity::Http>, guild_id: serenity::GuildId) -> Self {
        Self { http, guild_id }
    }
}

#[async_trait]
impl MembershipGauge for PruneCountGauge {
    async fn estimate_inactive(&self, days: u8) -> Result<Option<u64>, InactivityError> {
        match self.http.get_guild_prune_count(self.guild_id, days).await {
            Ok(prune) => Ok(Some(prune.pruned)),
            // A rejected request (bad window, missing permission) means "no
            // estimate", not a dead gateway.
            Err(serenity::Error::Http(err)) => {
                tracing::warn!("prune count unavailable: {err}");
                Ok(None)
            }
            Err(err) => Err(InactivityError::Service(err.to_string())),
        }
    }
}
