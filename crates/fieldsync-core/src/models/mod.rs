//! Data models for fieldsync

mod soil_data;
mod soil_metadata;

pub use soil_data::{
    changed_depth_dependent_data, changed_depth_intervals, changed_soil_data_fields,
    deleted_depth_intervals, DepthDependentFieldChanges, DepthDependentSoilData, DepthInterval,
    DepthIntervalChanges, DepthIntervalFieldChanges, SoilData, SoilDataChanges,
    SoilDataChangesEntry, SoilDataDepthInterval, SoilDataFieldChanges, SoilDataPushEntry,
    SoilDataPushFailureReason, SoilDataPushResult,
};
pub use soil_metadata::{
    SoilMetadata, SoilMetadataChanges, SoilMetadataChangesEntry, SoilMetadataPushEntry,
    SoilMetadataPushFailureReason, SoilMetadataPushResult, UserMatchRating, UserRatingEntry,
    UserRatingInput,
};
