use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use thiserror::Error;

use super::models::SchedulePayload;
use crate::core::clock::BOT_TIMEZONE;

#[derive(Debug, Error)]
pub enum StageError {
    #[error("schedule API error: {0}")]
    Api(String),

    #[error("failed to materialize report image: {0}")]
    Io(#[from] std::io::Error),
}

/// Port over the external schedule service. Exposes only the two calls
/// report building needs.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn fetch_schedules(&self) -> Result<SchedulePayload, StageError>;
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, StageError>;
}

/// A ready-to-send report. When `image_path` is set the sender attaches the
/// file and deletes it after a successful send.
#[derive(Debug)]
pub struct StageReport {
    pub caption: String,
    pub image_path: Option<PathBuf>,
}

pub struct StageReportService<S: ScheduleSource> {
    source: S,
    image_dir: PathBuf,
}

impl<S: ScheduleSource> StageReportService<S> {
    pub fn new(source: S, image_dir: impl AsRef<Path>) -> Self {
        Self {
            source,
            image_dir: image_dir.as_ref().to_path_buf(),
        }
    }

    /// Builds the battle-rotation report for the rotation covering `now`.
    /// `Ok(None)` when no rotation does (e.g. schedule data ran out).
    pub async fn build_battle_report(
        &self,
        now: DateTime<Tz>,
    ) -> Result<Option<StageReport>, StageError> {
        let payload = self.source.fetch_schedules().await?;
        let data = payload.data;

        let Some(regular) = data
            .regular_schedules
            .nodes
            .iter()
            .find(|node| node.covers(now))
        else {
            return Ok(None);
        };

        let until = regular
            .end_time
            .with_timezone(&BOT_TIMEZONE)
            .format("%H:%M");
        let mut caption = format!("Stage rotation until {until}\n");

        if let Some(setting) = regular.regular_match_setting.as_ref() {
            caption.push_str(&format!(
                "Regular ({}): {}\n",
                setting.vs_rule.name,
                setting.stage_names()
            ));
        }

        if let Some(anarchy) = data
            .bankara_schedules
            .nodes
            .iter()
            .find(|node| node.covers(now))
        {
            for setting in anarchy.bankara_match_settings.iter().flatten() {
                caption.push_str(&format!(
                    "Anarchy ({}): {}\n",
                    setting.vs_rule.name,
                    setting.stage_names()
                ));
            }
        }

        // During a Splatfest the fest list carries the live rotation; fold it
        // into the same caption rather than posting a second report.
        if let Some(fest_schedules) = data.fest_schedules.as_ref() {
            if let Some(fest) = fest_schedules.nodes.iter().find(|node| node.covers(now)) {
                for setting in fest.fest_match_settings.iter().flatten() {
                    caption.push_str(&format!(
                        "Splatfest ({}): {}\n",
                        setting.vs_rule.name,
                        setting.stage_names()
                    ));
                }
            }
        }

        let image_url = regular
            .regular_match_setting
            .as_ref()
            .and_then(|setting| setting.vs_stages.first())
            .and_then(|stage| stage.image.as_ref())
            .map(|image| image.url.clone());

        let image_path = match image_url {
            Some(url) => Some(self.materialize_image(&url, "stages", now).await?),
            None => None,
        };

        Ok(Some(StageReport {
            caption: caption.trim_end().to_string(),
            image_path,
        }))
    }

    /// Builds the Salmon Run report for the rotation covering `now`.
    pub async fn build_salmon_report(
        &self,
        now: DateTime<Tz>,
    ) -> Result<Option<StageReport>, StageError> {
        let payload = self.source.fetch_schedules().await?;
        let nodes = payload.data.coop_grouping_schedule.regular_schedules.nodes;

        let Some(rotation) = nodes.iter().find(|node| node.covers(now)) else {
            return Ok(None);
        };

        let until = rotation
            .end_time
            .with_timezone(&BOT_TIMEZONE)
            .format("%m/%d %H:%M");
        let caption = format!(
            "Salmon Run until {until} at {}\nWeapons: {}",
            rotation.setting.coop_stage.name,
            rotation.setting.weapon_names()
        );

        let image_path = match rotation.setting.coop_stage.image.as_ref() {
            Some(image) => Some(self.materialize_image(&image.url, "salmon", now).await?),
            None => None,
        };

        Ok(Some(StageReport {
            caption,
            image_path,
        }))
    }

    async fn materialize_image(
        &self,
        url: &str,
        prefix: &str,
        now: DateTime<Tz>,
    ) -> Result<PathBuf, StageError> {
        let bytes = self.source.fetch_image(url).await?;
        std::fs::create_dir_all(&self.image_dir)?;
        let path = self
            .image_dir
            .join(format!("{prefix}_{}.png", now.format("%Y%m%d%H%M")));
        std::fs::write(&path, bytes)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;

    const FIXTURE: &str = r#"{
        "data": {
            "regularSchedules": { "nodes": [
                {
                    "startTime": "2024-05-02T09:00:00+09:00",
                    "endTime": "2024-05-02T11:00:00+09:00",
                    "regularMatchSetting": {
                        "vsStages": [
                            { "name": "Scorch Gorge", "image": { "url": "https://img.example/scorch.png" } },
                            { "name": "Eeltail Alley" }
                        ],
                        "vsRule": { "name": "Turf War" }
                    }
                }
            ] },
            "bankaraSchedules": { "nodes": [
                {
                    "startTime": "2024-05-02T09:00:00+09:00",
                    "endTime": "2024-05-02T11:00:00+09:00",
                    "bankaraMatchSettings": [
                        {
                            "vsStages": [ { "name": "Hagglefish Market" }, { "name": "Undertow Spillway" } ],
                            "vsRule": { "name": "Splat Zones" }
                        },
                        {
                            "vsStages": [ { "name": "Mincemeat Metalworks" }, { "name": "Hammerhead Bridge" } ],
                            "vsRule": { "name": "Tower Control" }
                        }
                    ]
                }
            ] },
            "coopGroupingSchedule": { "regularSchedules": { "nodes": [
                {
                    "startTime": "2024-05-01T17:00:00+09:00",
                    "endTime": "2024-05-03T09:00:00+09:00",
                    "setting": {
                        "coopStage": { "name": "Spawning Grounds", "image": { "url": "https://img.example/spawning.png" } },
                        "weapons": [
                            { "name": "Splattershot" },
                            { "name": "Splat Roller" },
                            { "name": "Splat Charger" },
                            { "name": "Slosher" }
                        ]
                    }
                }
            ] } }
        }
    }"#;

    struct FixtureSource {
        fetched_urls: Mutex<Vec<String>>,
    }

    impl FixtureSource {
        fn new() -> Self {
            Self {
                fetched_urls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ScheduleSource for FixtureSource {
        async fn fetch_schedules(&self) -> Result<SchedulePayload, StageError> {
            serde_json::from_str(FIXTURE).map_err(|e| StageError::Api(e.to_string()))
        }

        async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, StageError> {
            self.fetched_urls.lock().unwrap().push(url.to_string());
            Ok(b"png bytes".to_vec())
        }
    }

    fn at(hour: u32, minute: u32) -> DateTime<Tz> {
        BOT_TIMEZONE
            .with_ymd_and_hms(2024, 5, 2, hour, minute, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn battle_report_covers_every_mode_in_one_caption() {
        let dir = tempfile::tempdir().unwrap();
        let service = StageReportService::new(FixtureSource::new(), dir.path());

        let report = service.build_battle_report(at(9, 0)).await.unwrap().unwrap();

        assert!(report.caption.contains("until 11:00"));
        assert!(report.caption.contains("Regular (Turf War): Scorch Gorge / Eeltail Alley"));
        assert!(report.caption.contains("Anarchy (Splat Zones)"));
        assert!(report.caption.contains("Anarchy (Tower Control)"));

        let path = report.image_path.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"png bytes");
        assert_eq!(
            service.source.fetched_urls.lock().unwrap().as_slice(),
            ["https://img.example/scorch.png"]
        );
    }

    #[tokio::test]
    async fn battle_report_is_absent_outside_every_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let service = StageReportService::new(FixtureSource::new(), dir.path());

        assert!(service.build_battle_report(at(23, 0)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn salmon_report_names_stage_and_weapons() {
        let dir = tempfile::tempdir().unwrap();
        let service = StageReportService::new(FixtureSource::new(), dir.path());

        let report = service.build_salmon_report(at(9, 30)).await.unwrap().unwrap();

        assert!(report.caption.contains("Spawning Grounds"));
        assert!(report.caption.contains("Splattershot, Splat Roller, Splat Charger, Slosher"));
        assert!(report.caption.contains("until 05/03 09:00"));
        assert!(report.image_path.is_some());
    }

    #[tokio::test]
    async fn source_failure_propagates() {
        struct DownSource;

        #[async_trait]
        impl ScheduleSource for DownSource {
            async fn fetch_schedules(&self) -> Result<SchedulePayload, StageError> {
                Err(StageError::Api("503".to_string()))
            }

            async fn fetch_image(&self, _url: &str) -> Result<Vec<u8>, StageError> {
                unreachable!("no image fetch without a schedule")
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let service = StageReportService::new(DownSource, dir.path());

        assert!(service.build_battle_report(at(9, 0)).await.is_err());
    }
}
