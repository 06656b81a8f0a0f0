use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

/// Hard cap on the limit a member can request, so a typo can't lock a
/// channel down to nothing or disable joining outright.
pub const MAX_USER_LIMIT: u32 = 20;

pub const NOT_IN_VOICE_MESSAGE: &str = "You need to be in a voice channel to use this.";

pub fn clamp_limit(value: u32) -> u32 {
    value.min(MAX_USER_LIMIT)
}

/// Set a member limit on the voice channel you are currently in (max 20).
#[poise::command(slash_command, guild_only)]
pub async fn limit(
    ctx: Context<'_>,
    #[description = "Member limit to apply (capped at 20)"] value: u32,
) -> Result<(), Error> {
    let applied = clamp_limit(value);

    // Copy the channel id out of the cache guard before awaiting.
    let voice_channel = ctx.guild().and_then(|guild| {
        guild
            .voice_states
            .get(&ctx.author().id)
            .and_then(|state| state.channel_id)
    });

    let Some(channel_id) = voice_channel else {
        ctx.say(NOT_IN_VOICE_MESSAGE).await?;
        return Ok(());
    };

    channel_id
        .edit(ctx, serenity::EditChannel::new().user_limit(applied))
        .await?;
    ctx.say(format!("Member limit for this channel is now {applied}."))
        .await?;
    tracing::info!(channel = channel_id.get(), applied, "voice channel limit changed");

    Ok(())
}
