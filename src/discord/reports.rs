use anyhow::Result;
use poise::serenity_prelude as serenity;

use crate::core::stages::StageReport;

/// Send a report to the channel: the caption, plus the image when one was
/// materialized. The local image file is deleted after a successful send.
pub async fn send_report(
    http: &serenity::Http,
    channel_id: serenity::ChannelId,
    report: StageReport,
) -> Result<()> {
    let mut message = serenity::CreateMessage::new().content(report.caption);
    if let Some(path) = &report.image_path {
        message = message.add_file(serenity::CreateAttachment::path(path).await?);
    }

    channel_id.send_message(http, message).await?;

    if let Some(path) = &report.image_path {
        if let Err(err) = std::fs::remove_file(path) {
            tracing::warn!("failed to remove report image {}: {err}", path.display());
        }
    }

    Ok(())
}
