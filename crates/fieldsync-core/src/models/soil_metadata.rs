//! Soil metadata model (user ratings of soil matches)

use serde::{Deserialize, Serialize};

use crate::sync::{ChangeDiff, PushInput, PushOutcome, PushResultEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserMatchRating {
    Selected,
    Rejected,
    Unsure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRatingEntry {
    pub soil_match_id: String,
    #[serde(default)]
    pub rating: Option<UserMatchRating>,
}

/// Per-site metadata kept alongside soil data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilMetadata {
    #[serde(default)]
    pub user_ratings: Vec<UserRatingEntry>,
}

impl SoilMetadata {
    /// Set (or clear, with `None`) the user's rating of a soil match.
    #[must_use]
    pub fn with_rating(&self, soil_match_id: &str, rating: Option<UserMatchRating>) -> Self {
        let mut user_ratings = self
            .user_ratings
            .iter()
            .filter(|entry| entry.soil_match_id != soil_match_id)
            .cloned()
            .collect::<Vec<_>>();
        user_ratings.push(UserRatingEntry {
            soil_match_id: soil_match_id.to_string(),
            rating,
        });
        Self { user_ratings }
    }

    pub fn rating_for(&self, soil_match_id: &str) -> Option<UserMatchRating> {
        self.user_ratings
            .iter()
            .find(|entry| entry.soil_match_id == soil_match_id)
            .and_then(|entry| entry.rating)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SoilMetadataPushFailureReason {
    DoesNotExist,
    InvalidData,
    NotAllowed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRatingInput {
    pub soil_match_id: String,
    pub rating: UserMatchRating,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilMetadataChanges {
    /// The full set of non-null ratings, sent when any rating changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_ratings: Option<Vec<UserRatingInput>>,
}

impl ChangeDiff for SoilMetadata {
    type Changes = SoilMetadataChanges;

    fn changes_since(&self, baseline: Option<&Self>) -> SoilMetadataChanges {
        if baseline.is_some_and(|baseline| baseline.user_ratings == self.user_ratings) {
            return SoilMetadataChanges::default();
        }
        let user_ratings = self
            .user_ratings
            .iter()
            .filter_map(|entry| {
                entry.rating.map(|rating| UserRatingInput {
                    soil_match_id: entry.soil_match_id.clone(),
                    rating,
                })
            })
            .collect();
        SoilMetadataChanges {
            user_ratings: Some(user_ratings),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilMetadataChangesEntry {
    pub site_id: String,
    #[serde(flatten)]
    pub changes: SoilMetadataChanges,
}

impl From<PushInput<SoilMetadataChanges>> for Vec<SoilMetadataChangesEntry> {
    fn from(input: PushInput<SoilMetadataChanges>) -> Self {
        input
            .entries
            .into_iter()
            .map(|entry| SoilMetadataChangesEntry {
                site_id: entry.site_id,
                changes: entry.changes,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilMetadataPushEntry {
    pub site_id: String,
    pub result: SoilMetadataPushResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SoilMetadataPushResult {
    Success {
        #[serde(rename = "soilMetadata")]
        soil_metadata: SoilMetadata,
    },
    Failure {
        reason: SoilMetadataPushFailureReason,
    },
}

impl From<SoilMetadataPushEntry> for PushResultEntry<SoilMetadata, SoilMetadataPushFailureReason> {
    fn from(entry: SoilMetadataPushEntry) -> Self {
        let outcome = match entry.result {
            SoilMetadataPushResult::Success { soil_metadata } => PushOutcome::Success(soil_metadata),
            SoilMetadataPushResult::Failure { reason } => PushOutcome::Failure(reason),
        };
        Self {
            site_id: entry.site_id,
            outcome,
        }
    }
}
