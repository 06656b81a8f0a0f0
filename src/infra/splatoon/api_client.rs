use async_trait::async_trait;
use reqwest::Client;

use crate::core::stages::{SchedulePayload, ScheduleSource, StageError};

/// Minimal splatoon3.ink client. It deliberately exposes only the calls the
/// core layer needs.
pub struct Splatoon3ApiClient {
    client: Client,
    base_url: String,
}

impl Splatoon3ApiClient {
    pub fn new() -> Result<Self, StageError> {
        let client = Client::builder()
            .user_agent("stagekeeper/0.2 (Discord stage report bot)")
            .build()
            .map_err(|e| StageError::Api(e.to_string()))?;

        Ok(Self {
            client,
            base_url: "https://splatoon3.ink".to_string(),
        })
    }
}

#[async_trait]
impl ScheduleSource for Splatoon3ApiClient {
    async fn fetch_schedules(&self) -> Result<SchedulePayload, StageError> {
        let url = format!("{}/data/schedules.json", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StageError::Api(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StageError::Api(format!(
                "schedule endpoint returned {}",
                response.status()
            )));
        }

        response
            .json::<SchedulePayload>()
            .await
            .map_err(|e| StageError::Api(e.to_string()))
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, StageError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StageError::Api(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StageError::Api(format!(
                "image fetch returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StageError::Api(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
