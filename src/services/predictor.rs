//! Spoilage prediction
//!
//! Classification asks an external model service first and falls back to a
//! threshold heuristic when the service is unreachable, slow, or returns
//! garbage. A reading is never rejected because the model is down.

use crate::config::PredictorConfig;
use crate::models::{BatchStatus, Verdict};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Ethanol level above which milk is considered spoiled (ppm)
pub const ETHANOL_SPOILED_PPM: f64 = 200.0;
/// Ammonia level above which milk is considered spoiled (ppm)
pub const AMMONIA_SPOILED_PPM: f64 = 30.0;
/// Hydrogen sulfide level above which milk is considered spoiled (ppm)
pub const H2S_SPOILED_PPM: f64 = 10.0;

/// Shelf life reported by the heuristic for good milk (days)
const FALLBACK_SHELF_LIFE_DAYS: f64 = 4.0;
/// Confidence reported by the heuristic
const FALLBACK_CONFIDENCE: f64 = 0.75;
/// Confidence assumed when the model omits one
const DEFAULT_MODEL_CONFIDENCE: f64 = 0.9;

/// A spoilage predictor
#[async_trait]
pub trait Predictor: Send + Sync {
    /// Classify one gas sample
    async fn predict(&self, ethanol: f64, ammonia: f64, h2s: f64) -> Result<Verdict>;
}

#[derive(Debug, Serialize)]
struct PredictRequest {
    ethanol: f64,
    ammonia: f64,
    h2s: f64,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    status: String,
    shelf_life: f64,
    #[serde(default = "default_confidence")]
    confidence: f64,
}

fn default_confidence() -> f64 {
    DEFAULT_MODEL_CONFIDENCE
}

/// Predictor backed by an external HTTP model service
pub struct HttpPredictor {
    client: reqwest::Client,
    url: String,
}

impl HttpPredictor {
    pub fn new(config: &PredictorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build predictor HTTP client")?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl Predictor for HttpPredictor {
    async fn predict(&self, ethanol: f64, ammonia: f64, h2s: f64) -> Result<Verdict> {
        let response = self
            .client
            .post(&self.url)
            .json(&PredictRequest {
                ethanol,
                ammonia,
                h2s,
            })
            .send()
            .await
            .context("Predictor request failed")?
            .error_for_status()
            .context("Predictor returned an error status")?;

        let body: PredictResponse = response
            .json()
            .await
            .context("Predictor returned malformed JSON")?;

        let status = BatchStatus::from_str(&body.status)
            .context("Predictor returned an unknown status")?;

        Ok(Verdict {
            status,
            shelf_life: body.shelf_life,
            confidence: body.confidence,
        })
    }
}

/// Threshold heuristic used when the model service is unavailable.
///
/// Milk is spoiled when any gas exceeds its threshold. Good milk gets a
/// fixed conservative shelf life rather than a made-up varying one.
pub fn fallback_verdict(ethanol: f64, ammonia: f64, h2s: f64) -> Verdict {
    let spoiled =
        ethanol > ETHANOL_SPOILED_PPM || ammonia > AMMONIA_SPOILED_PPM || h2s > H2S_SPOILED_PPM;

    if spoiled {
        Verdict {
            status: BatchStatus::Spoiled,
            shelf_life: 0.0,
            confidence: FALLBACK_CONFIDENCE,
        }
    } else {
        Verdict {
            status: BatchStatus::Good,
            shelf_life: FALLBACK_SHELF_LIFE_DAYS,
            confidence: FALLBACK_CONFIDENCE,
        }
    }
}
