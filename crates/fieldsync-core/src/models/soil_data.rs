//! Soil data model and its change diff

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::sync::{ChangeDiff, PushInput, PushOutcome, PushResultEntry};

/// Depth range in centimeters, used as the key for per-depth data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DepthInterval {
    pub start: u32,
    pub end: u32,
}

/// Configuration of a depth interval at a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilDataDepthInterval {
    pub depth_interval: DepthInterval,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub soil_texture_enabled: Option<bool>,
    #[serde(default)]
    pub soil_color_enabled: Option<bool>,
}

/// Observations recorded for one depth interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthDependentSoilData {
    pub depth_interval: DepthInterval,
    #[serde(default)]
    pub texture: Option<String>,
    #[serde(default)]
    pub clay_percent: Option<u32>,
    #[serde(default)]
    pub rock_fragment_volume: Option<String>,
    #[serde(default)]
    pub carbonates: Option<String>,
}

/// Soil observations for a single site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilData {
    #[serde(default)]
    pub down_slope: Option<String>,
    #[serde(default)]
    pub cross_slope: Option<String>,
    #[serde(default)]
    pub slope_aspect: Option<u32>,
    #[serde(default)]
    pub slope_steepness_select: Option<String>,
    #[serde(default)]
    pub slope_steepness_percent: Option<u32>,
    #[serde(default)]
    pub surface_cracks_select: Option<String>,
    #[serde(default)]
    pub soil_depth_select: Option<String>,
    #[serde(default)]
    pub flooding_select: Option<String>,
    #[serde(default)]
    pub land_cover_select: Option<String>,
    #[serde(default)]
    pub grazing_select: Option<String>,
    #[serde(default)]
    pub depth_interval_preset: Option<String>,
    #[serde(default)]
    pub depth_intervals: Vec<SoilDataDepthInterval>,
    #[serde(default)]
    pub depth_dependent_data: Vec<DepthDependentSoilData>,
}

/// Why the server rejected a soil data push for a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SoilDataPushFailureReason {
    DoesNotExist,
    InvalidData,
    NotAllowed,
}

/// Top-level soil data fields that changed. `Some(None)` clears a field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilDataFieldChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub down_slope: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_slope: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slope_aspect: Option<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slope_steepness_select: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slope_steepness_percent: Option<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surface_cracks_select: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soil_depth_select: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flooding_select: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub land_cover_select: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grazing_select: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth_interval_preset: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthIntervalFieldChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soil_texture_enabled: Option<Option<bool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soil_color_enabled: Option<Option<bool>>,
}

impl DepthIntervalFieldChanges {
    pub const fn is_empty(&self) -> bool {
        self.label.is_none() && self.soil_texture_enabled.is_none() && self.soil_color_enabled.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthDependentFieldChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub texture: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clay_percent: Option<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rock_fragment_volume: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carbonates: Option<Option<String>>,
}

impl DepthDependentFieldChanges {
    pub const fn is_empty(&self) -> bool {
        self.texture.is_none()
            && self.clay_percent.is_none()
            && self.rock_fragment_volume.is_none()
            && self.carbonates.is_none()
    }
}

/// Changed fields of one depth interval, keyed by the interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthIntervalChanges<F> {
    pub depth_interval: DepthInterval,
    #[serde(flatten)]
    pub changed_fields: F,
}

/// Everything about a site's soil data that a push needs to send.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilDataChanges {
    #[serde(flatten)]
    pub fields: SoilDataFieldChanges,
    pub depth_intervals: Vec<DepthIntervalChanges<DepthIntervalFieldChanges>>,
    pub deleted_depth_intervals: Vec<DepthInterval>,
    pub depth_dependent_data: Vec<DepthIntervalChanges<DepthDependentFieldChanges>>,
}

/// Push input wrapper as sent on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilDataChangesEntry {
    pub site_id: String,
    pub soil_data: SoilDataChanges,
}

impl From<PushInput<SoilDataChanges>> for Vec<SoilDataChangesEntry> {
    fn from(input: PushInput<SoilDataChanges>) -> Self {
        input
            .entries
            .into_iter()
            .map(|entry| SoilDataChangesEntry {
                site_id: entry.site_id,
                soil_data: entry.changes,
            })
            .collect()
    }
}

impl ChangeDiff for SoilData {
    type Changes = SoilDataChanges;

    fn changes_since(&self, baseline: Option<&Self>) -> SoilDataChanges {
        SoilDataChanges {
            fields: changed_soil_data_fields(self, baseline),
            depth_intervals: changed_depth_intervals(self, baseline),
            deleted_depth_intervals: deleted_depth_intervals(self, baseline),
            depth_dependent_data: changed_depth_dependent_data(self, baseline),
        }
    }
}

/// `Some(current)` when the field differs from the baseline.
///
/// Without a baseline only fields that are set count as changed.
fn changed_field<T: Clone + PartialEq>(current: &Option<T>, baseline: Option<&Option<T>>) -> Option<Option<T>> {
    match baseline {
        None => current.clone().map(Some),
        Some(previous) if previous == current => None,
        Some(_) => Some(current.clone()),
    }
}

pub fn changed_soil_data_fields(current: &SoilData, baseline: Option<&SoilData>) -> SoilDataFieldChanges {
    SoilDataFieldChanges {
        down_slope: changed_field(&current.down_slope, baseline.map(|b| &b.down_slope)),
        cross_slope: changed_field(&current.cross_slope, baseline.map(|b| &b.cross_slope)),
        slope_aspect: changed_field(&current.slope_aspect, baseline.map(|b| &b.slope_aspect)),
        slope_steepness_select: changed_field(
            &current.slope_steepness_select,
            baseline.map(|b| &b.slope_steepness_select),
        ),
        slope_steepness_percent: changed_field(
            &current.slope_steepness_percent,
            baseline.map(|b| &b.slope_steepness_percent),
        ),
        surface_cracks_select: changed_field(
            &current.surface_cracks_select,
            baseline.map(|b| &b.surface_cracks_select),
        ),
        soil_depth_select: changed_field(
            &current.soil_depth_select,
            baseline.map(|b| &b.soil_depth_select),
        ),
        flooding_select: changed_field(&current.flooding_select, baseline.map(|b| &b.flooding_select)),
        land_cover_select: changed_field(
            &current.land_cover_select,
            baseline.map(|b| &b.land_cover_select),
        ),
        grazing_select: changed_field(&current.grazing_select, baseline.map(|b| &b.grazing_select)),
        depth_interval_preset: changed_field(
            &current.depth_interval_preset,
            baseline.map(|b| &b.depth_interval_preset),
        ),
    }
}

pub fn changed_depth_intervals(
    current: &SoilData,
    baseline: Option<&SoilData>,
) -> Vec<DepthIntervalChanges<DepthIntervalFieldChanges>> {
    let previous = baseline
        .map(|b| index_by_interval(&b.depth_intervals, |di| di.depth_interval))
        .unwrap_or_default();

    current
        .depth_intervals
        .iter()
        .map(|interval| {
            let before = previous.get(&interval.depth_interval).copied();
            DepthIntervalChanges {
                depth_interval: interval.depth_interval,
                changed_fields: DepthIntervalFieldChanges {
                    label: changed_field(&interval.label, before.map(|b| &b.label)),
                    soil_texture_enabled: changed_field(
                        &interval.soil_texture_enabled,
                        before.map(|b| &b.soil_texture_enabled),
                    ),
                    soil_color_enabled: changed_field(
                        &interval.soil_color_enabled,
                        before.map(|b| &b.soil_color_enabled),
                    ),
                },
            }
        })
        .filter(|changes| !changes.changed_fields.is_empty())
        .collect()
}

/// Intervals present in the baseline but no longer present locally.
pub fn deleted_depth_intervals(current: &SoilData, baseline: Option<&SoilData>) -> Vec<DepthInterval> {
    let Some(baseline) = baseline else {
        return Vec::new();
    };
    let current_intervals = index_by_interval(&current.depth_intervals, |di| di.depth_interval);
    baseline
        .depth_intervals
        .iter()
        .map(|di| di.depth_interval)
        .filter(|interval| !current_intervals.contains_key(interval))
        .collect()
}

pub fn changed_depth_dependent_data(
    current: &SoilData,
    baseline: Option<&SoilData>,
) -> Vec<DepthIntervalChanges<DepthDependentFieldChanges>> {
    let previous = baseline
        .map(|b| index_by_interval(&b.depth_dependent_data, |dd| dd.depth_interval))
        .unwrap_or_default();

    current
        .depth_dependent_data
        .iter()
        .map(|data| {
            let before = previous.get(&data.depth_interval).copied();
            DepthIntervalChanges {
                depth_interval: data.depth_interval,
                changed_fields: DepthDependentFieldChanges {
                    texture: changed_field(&data.texture, before.map(|b| &b.texture)),
                    clay_percent: changed_field(&data.clay_percent, before.map(|b| &b.clay_percent)),
                    rock_fragment_volume: changed_field(
                        &data.rock_fragment_volume,
                        before.map(|b| &b.rock_fragment_volume),
                    ),
                    carbonates: changed_field(&data.carbonates, before.map(|b| &b.carbonates)),
                },
            }
        })
        .filter(|changes| !changes.changed_fields.is_empty())
        .collect()
}

fn index_by_interval<T>(items: &[T], key: impl Fn(&T) -> DepthInterval) -> BTreeMap<DepthInterval, &T> {
    items.iter().map(|item| (key(item), item)).collect()
}

/// One site's entry in a soil data push response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilDataPushEntry {
    pub site_id: String,
    pub result: SoilDataPushResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SoilDataPushResult {
    Success {
        #[serde(rename = "soilData")]
        soil_data: SoilData,
    },
    Failure {
        reason: SoilDataPushFailureReason,
    },
}

impl From<SoilDataPushEntry> for PushResultEntry<SoilData, SoilDataPushFailureReason> {
    fn from(entry: SoilDataPushEntry) -> Self {
        let outcome = match entry.result {
            SoilDataPushResult::Success { soil_data } => PushOutcome::Success(soil_data),
            SoilDataPushResult::Failure { reason } => PushOutcome::Failure(reason),
        };
        Self {
            site_id: entry.site_id,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const TOP: DepthInterval = DepthInterval { start: 0, end: 10 };
    const MIDDLE: DepthInterval = DepthInterval { start: 10, end: 30 };

    fn interval(depth_interval: DepthInterval, label: &str) -> SoilDataDepthInterval {
        SoilDataDepthInterval {
            depth_interval,
            label: Some(label.to_string()),
            soil_texture_enabled: None,
            soil_color_enabled: None,
        }
    }

    fn depth_data(depth_interval: DepthInterval, texture: &str) -> DepthDependentSoilData {
        DepthDependentSoilData {
            depth_interval,
            texture: Some(texture.to_string()),
            clay_percent: None,
            rock_fragment_volume: None,
            carbonates: None,
        }
    }

    #[test]
    fn no_baseline_sends_every_set_field() {
        let data = SoilData {
            slope_aspect: Some(90),
            depth_intervals: vec![interval(TOP, "top")],
            depth_dependent_data: vec![depth_data(TOP, "SILT")],
            ..SoilData::default()
        };

        let changes = data.changes_since(None);

        assert_eq!(
            changes.fields,
            SoilDataFieldChanges {
                slope_aspect: Some(Some(90)),
                ..SoilDataFieldChanges::default()
            }
        );
        assert_eq!(changes.depth_intervals.len(), 1);
        assert_eq!(
            changes.depth_intervals[0].changed_fields.label,
            Some(Some("top".to_string()))
        );
        assert_eq!(changes.depth_dependent_data.len(), 1);
        assert!(changes.deleted_depth_intervals.is_empty());
    }

    #[test]
    fn unchanged_data_produces_empty_changes() {
        let data = SoilData {
            grazing_select: Some("CATTLE".to_string()),
            depth_intervals: vec![interval(TOP, "top")],
            ..SoilData::default()
        };
        assert_eq!(data.changes_since(Some(&data)), SoilDataChanges::default());
    }

    #[test]
    fn cleared_field_is_sent_as_null() {
        let baseline = SoilData {
            flooding_select: Some("RARE".to_string()),
            ..SoilData::default()
        };
        let current = SoilData::default();

        let changes = current.changes_since(Some(&baseline));
        assert_eq!(changes.fields.flooding_select, Some(None));

        let json = serde_json::to_value(&changes).unwrap();
        assert_eq!(json["floodingSelect"], serde_json::Value::Null);
        assert!(json.get("slopeAspect").is_none());
    }

    #[test]
    fn depth_interval_changes_are_keyed_by_interval() {
        let baseline = SoilData {
            depth_intervals: vec![interval(TOP, "top"), interval(MIDDLE, "middle")],
            depth_dependent_data: vec![depth_data(TOP, "SILT"), depth_data(MIDDLE, "CLAY")],
            ..SoilData::default()
        };
        let current = SoilData {
            depth_intervals: vec![interval(TOP, "surface")],
            depth_dependent_data: vec![depth_data(TOP, "SILT"), depth_data(MIDDLE, "LOAM")],
            ..SoilData::default()
        };

        let changes = current.changes_since(Some(&baseline));

        assert_eq!(changes.deleted_depth_intervals, vec![MIDDLE]);
        assert_eq!(
            changes.depth_intervals,
            vec![DepthIntervalChanges {
                depth_interval: TOP,
                changed_fields: DepthIntervalFieldChanges {
                    label: Some(Some("surface".to_string())),
                    ..DepthIntervalFieldChanges::default()
                },
            }]
        );
        assert_eq!(
            changes.depth_dependent_data,
            vec![DepthIntervalChanges {
                depth_interval: MIDDLE,
                changed_fields: DepthDependentFieldChanges {
                    texture: Some(Some("LOAM".to_string())),
                    ..DepthDependentFieldChanges::default()
                },
            }]
        );
    }

    #[test]
    fn push_entry_parses_success_and_failure() {
        let success: SoilDataPushEntry = serde_json::from_str(
            r#"{"siteId":"s1","result":{"soilData":{"slopeAspect":45}}}"#,
        )
        .unwrap();
        let failure: SoilDataPushEntry =
            serde_json::from_str(r#"{"siteId":"s2","result":{"reason":"DOES_NOT_EXIST"}}"#)
                .unwrap();

        let success = PushResultEntry::from(success);
        let failure = PushResultEntry::from(failure);

        assert_eq!(
            success.outcome,
            PushOutcome::Success(SoilData {
                slope_aspect: Some(45),
                ..SoilData::default()
            })
        );
        assert_eq!(
            failure.outcome,
            PushOutcome::Failure(SoilDataPushFailureReason::DoesNotExist)
        );
    }
}
