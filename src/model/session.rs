use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::foundation::error::{ReportError, ReportResult};

/// Session data collected right before a report is generated.
///
/// `session_time` is free text (`"14:30"`); an empty string counts as absent. Missing or blank
/// required fields deserialize fine and are rejected by [`SessionInput::validate`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInput {
    #[serde(default)]
    pub therapist_name: String,
    #[serde(default)]
    pub client_name: String,
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub session_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_time: Option<String>,
    #[serde(default, rename = "selectedFrequencies", alias = "selectedItemIds")]
    pub selected_item_ids: BTreeSet<u32>,
}

fn blank_as_none<'de, D: Deserializer<'de>>(de: D) -> Result<Option<NaiveDate>, D::Error> {
    match Option::<String>::deserialize(de)?.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

impl SessionInput {
    /// Check the generation preconditions and return the session date.
    ///
    /// Names that are empty after trimming are treated as missing.
    pub fn validate(&self) -> ReportResult<NaiveDate> {
        if self.therapist_name.trim().is_empty() {
            return Err(ReportError::MissingRequiredField("therapistName"));
        }
        if self.client_name.trim().is_empty() {
            return Err(ReportError::MissingRequiredField("clientName"));
        }
        let date = self
            .session_date
            .ok_or(ReportError::MissingRequiredField("sessionDate"))?;
        if self.selected_item_ids.is_empty() {
            return Err(ReportError::NoItemsSelected);
        }
        Ok(date)
    }

    /// The session time, if one was given.
    pub fn time(&self) -> Option<&str> {
        self.session_time
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn is_selected(&self, id: u32) -> bool {
        self.selected_item_ids.contains(&id)
    }
}
