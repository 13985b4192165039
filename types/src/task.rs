//! Task catalog definitions.

use crate::id::TaskId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How much effort a task takes. Hard tasks always require photographic proof.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => f.write_str("easy"),
            Difficulty::Hard => f.write_str("hard"),
        }
    }
}

/// A static task definition from the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub difficulty: Difficulty,
    pub title: String,
}

impl Task {
    pub fn new(id: TaskId, difficulty: Difficulty, title: impl Into<String>) -> Self {
        Self {
            id,
            difficulty,
            title: title.into(),
        }
    }

    pub fn is_hard(&self) -> bool {
        self.difficulty == Difficulty::Hard
    }
}
