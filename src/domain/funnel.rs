// Funnel normalization - flattens the sparse analytics payload into rows
use chrono::{DateTime, NaiveDate};
use serde_json::Value;

/// Funnel stage labels. Enum order is load-bearing: conversion is computed
/// between adjacent entries of `FUNNEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Applied,
    Accepted,
    Approved,
    Realized,
    Finished,
    Completed,
    /// Placeholder the aggregator drops. No current protocol key maps to it,
    /// but future stage additions may.
    SignUp,
}

impl Stage {
    /// The fixed conversion sequence. SignUp is never part of the funnel.
    pub const FUNNEL: [Stage; 6] = [
        Stage::Applied,
        Stage::Accepted,
        Stage::Approved,
        Stage::Realized,
        Stage::Finished,
        Stage::Completed,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Applied => "Applied",
            Stage::Accepted => "Accepted",
            Stage::Approved => "Approved",
            Stage::Realized => "Realized",
            Stage::Finished => "Finished",
            Stage::Completed => "Completed",
            Stage::SignUp => "Sign Up",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Applied" => Some(Stage::Applied),
            "Accepted" => Some(Stage::Accepted),
            "Approved" => Some(Stage::Approved),
            "Realized" => Some(Stage::Realized),
            "Finished" => Some(Stage::Finished),
            "Completed" => Some(Stage::Completed),
            "Sign Up" => Some(Stage::SignUp),
            _ => None,
        }
    }
}

/// Protocol stage keys mapped to labels, in output order.
const STAGE_KEYS: [(&str, Stage); 6] = [
    ("total_applications", Stage::Applied),
    ("total_an_accepted", Stage::Accepted),
    ("total_approvals", Stage::Approved),
    ("total_realized", Stage::Realized),
    ("total_finished", Stage::Finished),
    ("total_completed", Stage::Completed),
];

/// One time-windowed count for one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunnelRow {
    pub date: NaiveDate,
    pub stage: Stage,
    pub count: u64,
}

/// Flattens the `analytics` object into rows, grouped by stage in fixed key
/// order and by bucket order within a stage. A missing stage key, sub-object
/// or bucket array yields zero rows for that stage; nothing here errors.
pub fn normalize(analytics: &Value) -> Vec<FunnelRow> {
    let mut rows = Vec::new();
    for (key, stage) in STAGE_KEYS {
        // Sign-up counts live under "people"; every application-backed stage
        // lives under "applications".
        let parent = if key == "total_signup" { "people" } else { "applications" };
        let Some(buckets) = analytics
            .get(key)
            .and_then(|entry| entry.get(parent))
            .and_then(|sub| sub.get("buckets"))
            .and_then(Value::as_array)
        else {
            continue;
        };

        for bucket in buckets {
            let date = bucket
                .get("key_as_string")
                .and_then(Value::as_str)
                .and_then(parse_bucket_date);
            let count = bucket.get("doc_count").and_then(Value::as_u64);
            if let (Some(date), Some(count)) = (date, count) {
                rows.push(FunnelRow { date, stage, count });
            }
        }
    }
    rows
}

/// Bucket timestamps are RFC-3339 date-times; a plain calendar date is
/// tolerated as well.
fn parse_bucket_date(raw: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.date_naive())
        .ok()
        .or_else(|| raw.parse::<NaiveDate>().ok())
}
