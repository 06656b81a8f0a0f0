// Gateway event handlers feeding the append-only event log.
//
// Every handler drops bot-authored payloads before anything reaches the
// store, and copies what it needs out of cache guards before awaiting.

use anyhow::Result;
use poise::serenity_prelude::{self as serenity, Context};

use crate::core::logging::TrackedMessage;
use crate::discord::Data;

pub async fn handle_message(
    ctx: &Context,
    data: &Data,
    message: &serenity::Message,
) -> Result<()> {
    if message.author.bot {
        return Ok(());
    }

    let channel_name = channel_display_name(ctx, message.channel_id).await;
    tracing::info!(
        channel = %channel_name,
        author = %message.author.name,
        "message logged"
    );

    data.logs
        .on_message_sent(&message.author.name, &channel_name, &message.content)
        .await?;

    // Snapshot the message so edit/delete events stay loggable even when
    // Serenity's cache misses it.
    data.logs.remember_message(TrackedMessage {
        message_id: message.id.get(),
        channel_name,
        author_name: message.author.name.clone(),
        content: message.content.clone(),
    });

    Ok(())
}

pub async fn handle_message_update(
    ctx: &Context,
    data: &Data,
    old: Option<&serenity::Message>,
    event: &serenity::MessageUpdateEvent,
) -> Result<()> {
    // Embed unfurls and flag changes arrive without content; skip those.
    let Some(new_content) = event.content.clone() else {
        return Ok(());
    };
    let message_id = event.id.get();

    // Prefer our own snapshot over the Serenity cache.
    if let Some(mut tracked) = data.logs.get_tracked_message(message_id) {
        if tracked.content == new_content {
            return Ok(());
        }

        data.logs
            .on_message_edited(
                &tracked.author_name,
                &tracked.channel_name,
                &tracked.content,
                &new_content,
            )
            .await?;

        tracked.content = new_content;
        data.logs.remember_message(tracked);
        return Ok(());
    }

    // Fall back to the cached "old" message if we never tracked this one.
    let Some(old_msg) = old else {
        return Ok(());
    };
    if old_msg.author.bot || old_msg.content == new_content {
        return Ok(());
    }

    let channel_name = channel_display_name(ctx, event.channel_id).await;
    data.logs
        .on_message_edited(
            &old_msg.author.name,
            &channel_name,
            &old_msg.content,
            &new_content,
        )
        .await?;

    data.logs.remember_message(TrackedMessage {
        message_id,
        channel_name,
        author_name: old_msg.author.name.clone(),
        content: new_content,
    });

    Ok(())
}

pub async fn handle_message_delete(
    ctx: &Context,
    data: &Data,
    channel_id: serenity::ChannelId,
    message_id: serenity::MessageId,
) -> Result<()> {
    let Some(snapshot) = recover_deleted(ctx, data, channel_id, message_id).await else {
        return Ok(());
    };

    data.logs
        .on_message_deleted(&snapshot.author_name, &snapshot.channel_name, &snapshot.content)
        .await?;

    Ok(())
}

pub async fn handle_message_delete_bulk(
    ctx: &Context,
    data: &Data,
    channel_id: serenity::ChannelId,
    message_ids: &[serenity::MessageId],
) -> Result<()> {
    for message_id in message_ids {
        let Some(snapshot) = recover_deleted(ctx, data, channel_id, *message_id).await else {
            continue;
        };

        data.logs
            .on_message_bulk_deleted(
                &snapshot.author_name,
                &snapshot.channel_name,
                &snapshot.content,
            )
            .await?;
    }

    Ok(())
}

/// Best-effort recovery of a deleted message: our snapshot first, then
/// Serenity's cache. `None` when neither knows the message or its author
/// was a bot.
async fn recover_deleted(
    ctx: &Context,
    data: &Data,
    channel_id: serenity::ChannelId,
    message_id: serenity::MessageId,
) -> Option<TrackedMessage> {
    if let Some(snapshot) = data.logs.take_tracked_message(message_id.get()) {
        return Some(snapshot);
    }

    let cached = {
        let message = ctx.cache.message(channel_id, message_id)?;
        if message.author.bot {
            return None;
        }
        (message.author.name.clone(), message.content.clone())
    };

    let channel_name = channel_display_name(ctx, channel_id).await;
    Some(TrackedMessage {
        message_id: message_id.get(),
        channel_name,
        author_name: cached.0,
        content: cached.1,
    })
}

pub async fn handle_member_join(
    ctx: &Context,
    data: &Data,
    member: &serenity::Member,
) -> Result<()> {
    if member.user.bot {
        return Ok(());
    }

    let (guild_name, system_channel) = {
        let Some(guild) = ctx.cache.guild(member.guild_id) else {
            return Ok(());
        };
        (guild.name.clone(), guild.system_channel_id)
    };

    tracing::info!(member = %member.user.name, "new member joined");
    data.logs.on_join(&member.user.name, &guild_name).await?;

    if let Some(channel_id) = system_channel {
        channel_id
            .say(&ctx.http, greeting_message(member.display_name()))
            .await?;
    }

    Ok(())
}

fn greeting_message(name: &str) -> String {
    format!("Welcome, {name}! Have a look at the #rules channel first, then come say hi.")
}

pub async fn handle_voice_state_update(
    ctx: &Context,
    data: &Data,
    old: Option<&serenity::VoiceState>,
    new: &serenity::VoiceState,
) -> Result<()> {
    let Some(guild_id) = new.guild_id else {
        return Ok(());
    };
    let Some(member) = new.member.as_ref() else {
        return Ok(());
    };
    if member.user.bot {
        return Ok(());
    }

    let old_channel_id = old.and_then(|state| state.channel_id);
    let new_channel_id = new.channel_id;
    if old_channel_id == new_channel_id {
        // Mute/deafen/stream toggles, not a channel transition.
        return Ok(());
    }

    // Resolve names and remaining occupancy inside one cache scope so the
    // guard is dropped before any await.
    let (old_channel, new_channel_name) = {
        let Some(guild) = ctx.cache.guild(guild_id) else {
            return Ok(());
        };

        let channel_name = |channel_id: serenity::ChannelId| -> String {
            guild
                .channels
                .get(&channel_id)
                .map(|channel| channel.name.clone())
                .unwrap_or_else(|| channel_id.to_string())
        };
        let non_bot_occupants = |channel_id: serenity::ChannelId| -> usize {
            guild
                .voice_states
                .values()
                .filter(|state| state.channel_id == Some(channel_id))
                .filter(|state| {
                    guild
                        .members
                        .get(&state.user_id)
                        .map(|m| !m.user.bot)
                        .unwrap_or(true)
                })
                .count()
        };

        (
            old_channel_id.map(|id| (channel_name(id), non_bot_occupants(id))),
            new_channel_id.map(channel_name),
        )
    };

    let actor = member.user.name.as_str();

    // A move between channels is a departure plus an arrival.
    if let Some((old_name, remaining)) = &old_channel {
        tracing::info!(member = %actor, channel = %old_name, "left voice channel");
        data.logs.on_leave(actor, old_name).await?;

        if *remaining == 0 {
            if let Some(channel_id) = old_channel_id {
                channel_id
                    .edit(&ctx.http, serenity::EditChannel::new().user_limit(0))
                    .await?;
                tracing::info!(channel = %old_name, "voice channel emptied; member limit cleared");
                data.logs.on_all_left(old_name).await?;
            }
        }
    }

    if let Some(new_name) = &new_channel_name {
        tracing::info!(member = %actor, channel = %new_name, "joined voice channel");
        data.logs.on_join(actor, new_name).await?;
    }

    Ok(())
}

async fn channel_display_name(ctx: &Context, channel_id: serenity::ChannelId) -> String {
    channel_id
        .name(ctx)
        .await
        .unwrap_or_else(|_| channel_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_mentions_the_member_and_the_rules() {
        let greeting = greeting_message("Agent 3");
        assert!(greeting.contains("Agent 3"));
        assert!(greeting.contains("#rules"));
    }
}
