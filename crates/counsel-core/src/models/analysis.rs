// ABOUTME: Typed analysis payload produced by the Analysis Service
// ABOUTME: Per-axis statement evaluations, with unknown upstream fields preserved verbatim
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

use super::EvaluationAxis;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Qualitative rating attached to an evaluated statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementIcon {
    /// Appropriate and effective
    Good,
    /// Room for improvement
    Warning,
    /// Inappropriate or harmful
    Bad,
}

impl StatementIcon {
    /// Parse a wire name, ignoring case and surrounding whitespace
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "good" => Some(Self::Good),
            "warning" => Some(Self::Warning),
            "bad" => Some(Self::Bad),
            _ => None,
        }
    }
}

/// One evaluated statement under a single axis
///
/// `statement`, `evaluation`, `feedback`, `suggestions` and `icon` are the
/// shape every consumer relies on. Anything else the Analysis Service sends
/// (`emotion`, `function`, `clarity`, ...) is kept in `extra` and written back
/// out unchanged.
///
/// Decoding never fails on field shape. A known field whose value has an
/// unexpected type is left in `extra` as sent, and the typed field stays empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AnalysisStatement {
    /// Quoted statement from the transcript
    pub statement: String,
    /// Alternate carrier of the statement text used by some upstream prompts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Evaluation comment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<String>,
    /// Feedback text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    /// Suggested alternative phrasings
    pub suggestions: Vec<String>,
    /// Numeric score, when the upstream prompt produces one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Qualitative rating
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<StatementIcon>,
    /// Unrecognized upstream fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl<'de> Deserialize<'de> for AnalysisStatement {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Object(fields) => Self::from_fields(fields),
            Value::String(statement) => Self {
                statement,
                ..Self::default()
            },
            _ => Self::default(),
        })
    }
}

impl AnalysisStatement {
    fn from_fields(mut fields: Map<String, Value>) -> Self {
        // Always serialized, so never left behind in `extra`
        let statement = match fields.remove("statement") {
            Some(Value::String(text)) => text,
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        let suggestions = match fields.remove("suggestions") {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(text) => Some(text),
                    _ => None,
                })
                .collect(),
            Some(Value::String(text)) if !text.trim().is_empty() => vec![text],
            _ => Vec::new(),
        };

        let content = take_with(&mut fields, "content", as_string);
        let evaluation = take_with(&mut fields, "evaluation", as_string);
        let feedback = take_with(&mut fields, "feedback", as_string);
        let score = take_with(&mut fields, "score", as_score);
        let icon = take_with(&mut fields, "icon", |v| {
            v.as_str().and_then(StatementIcon::from_wire)
        });

        Self {
            statement,
            content,
            evaluation,
            feedback,
            suggestions,
            score,
            icon,
            extra: fields,
        }
    }

    /// Text used to locate this evaluation in the transcript
    ///
    /// `statement` when non-empty, otherwise `content`.
    #[must_use]
    pub fn source_text(&self) -> Option<&str> {
        if !self.statement.is_empty() {
            return Some(&self.statement);
        }
        self.content.as_deref().filter(|c| !c.is_empty())
    }
}

/// Per-axis analysis of a conversation
///
/// Empty until analysis completes. A completed analysis always carries all
/// four axis keys, possibly with empty lists.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisResult(BTreeMap<EvaluationAxis, Vec<AnalysisStatement>>);

impl AnalysisResult {
    /// Analysis placeholder for conversations that have not been analysed
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Completed analysis with every axis present
    #[must_use]
    pub fn from_axes(
        cct: Vec<AnalysisStatement>,
        sst: Vec<AnalysisStatement>,
        empathy: Vec<AnalysisStatement>,
        partnership: Vec<AnalysisStatement>,
    ) -> Self {
        let mut axes = BTreeMap::new();
        axes.insert(EvaluationAxis::Cct, cct);
        axes.insert(EvaluationAxis::Sst, sst);
        axes.insert(EvaluationAxis::Empathy, empathy);
        axes.insert(EvaluationAxis::Partnership, partnership);
        Self(axes)
    }

    /// Evaluations under one axis (empty when the axis is absent)
    #[must_use]
    pub fn axis(&self, axis: EvaluationAxis) -> &[AnalysisStatement] {
        self.0.get(&axis).map_or(&[], Vec::as_slice)
    }

    /// True when no axis key is present
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over present axes in axis order
    pub fn iter(&self) -> impl Iterator<Item = (EvaluationAxis, &[AnalysisStatement])> {
        self.0.iter().map(|(axis, list)| (*axis, list.as_slice()))
    }
}

/// Remove `key` from `fields` when `convert` accepts its value
///
/// Nulls are dropped. Values `convert` rejects stay where they are.
fn take_with<T>(
    fields: &mut Map<String, Value>,
    key: &str,
    convert: impl FnOnce(&Value) -> Option<T>,
) -> Option<T> {
    let value = fields.get(key)?;
    if value.is_null() {
        fields.remove(key);
        return None;
    }
    let converted = convert(value)?;
    fields.remove(key);
    Some(converted)
}

fn as_string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_owned)
}

fn as_score(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|s| s.is_finite()),
        _ => None,
    }
}
