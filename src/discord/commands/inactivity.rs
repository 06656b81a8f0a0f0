use crate::core::inactivity::{format_inactive_report, InactivityDetector};
use crate::discord::membership::PruneCountGauge;
use crate::discord::{Context, Error};

pub const DENIED_MESSAGE: &str = "You need the admin role to use this.";
pub const UNAVAILABLE_MESSAGE: &str = "Could not get an inactivity estimate right now.";

/// Report how many members have been inactive beyond a day threshold.
#[poise::command(slash_command, guild_only)]
pub async fn inactives(
    ctx: Context<'_>,
    #[description = "Inactivity threshold in days (default 30)"]
    #[min = 1]
    #[max = 30]
    days: Option<u8>,
) -> Result<(), Error> {
    let days = days.unwrap_or(30);

    let caller = ctx
        .author_member()
        .await
        .ok_or("member data unavailable for this interaction")?;
    let caller_is_admin = caller.roles.contains(&ctx.data().admin_role_id);
    tracing::info!(
        caller = %caller.user.name,
        days,
        caller_is_admin,
        "inactivity report requested"
    );

    if !caller_is_admin {
        ctx.say(DENIED_MESSAGE).await?;
        return Ok(());
    }

    let detector = InactivityDetector::new(PruneCountGauge::new(
        ctx.serenity_context().http.clone(),
        ctx.data().guild_id,
    ));

    match detector.detect(days).await? {
        Some(count) => {
            ctx.say(format_inactive_report(days, count)).await?;
        }
        None => {
            ctx.say(UNAVAILABLE_MESSAGE).await?;
        }
    }

    Ok(())
}
