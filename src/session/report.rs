use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::models::{GazeSample, Rect, SessionStats};

/// Payload handed to the report collaborator when a session finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub gaze_data: Vec<GazeSample>,
    pub session_stats: SessionStats,
    pub positions: BTreeMap<String, Rect>,
    pub new_words: Vec<String>,
}

impl SessionReport {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize session report")
    }
}

/// Words queued for later review, accumulated across sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewList {
    words: Vec<String>,
}

impl ReviewList {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("Failed to parse review list")
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize review list")
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Appends the words not already present, keeping first-seen order.
    /// Returns how many were added.
    pub fn merge<I, S>(&mut self, words: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen: HashSet<String> = self.words.iter().cloned().collect();
        let before = self.words.len();
        for word in words {
            let word = word.into();
            if seen.insert(word.clone()) {
                self.words.push(word);
            }
        }
        self.words.len() - before
    }
}
