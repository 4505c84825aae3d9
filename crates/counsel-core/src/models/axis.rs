// ABOUTME: The four fixed evaluation axes a transcript statement is scored along
// ABOUTME: Serialized lowercase on every wire (REST, Analysis Service, database)
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

use super::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Evaluation dimension of a transcript statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationAxis {
    /// Change talk cultivation
    Cct,
    /// Sustain talk softening
    Sst,
    /// Empathy
    Empathy,
    /// Partnership
    Partnership,
}

impl EvaluationAxis {
    /// Every axis, in display order
    pub const ALL: [Self; 4] = [Self::Cct, Self::Sst, Self::Empathy, Self::Partnership];

    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cct => "cct",
            Self::Sst => "sst",
            Self::Empathy => "empathy",
            Self::Partnership => "partnership",
        }
    }

    /// Human-readable title
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Cct => "Cultivating change talk",
            Self::Sst => "Softening sustain talk",
            Self::Empathy => "Empathy",
            Self::Partnership => "Partnership",
        }
    }
}

impl fmt::Display for EvaluationAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvaluationAxis {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cct" => Ok(Self::Cct),
            "sst" => Ok(Self::Sst),
            "empathy" => Ok(Self::Empathy),
            "partnership" => Ok(Self::Partnership),
            other => Err(ParseError::UnknownAxis(other.to_owned())),
        }
    }
}
