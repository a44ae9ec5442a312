// 🔍 Deduplication Engine - One entry per (function, location) per year
//
// Strategy: sort by date ascending, walk in order, keep the first record
// seen for each key. The earliest-dated entry wins whatever its source.

use crate::logging::LogSink;
use crate::record::{Record, RecordKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// DUPLICATE MATCH RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateMatch {
    /// Record that stayed
    pub kept: Record,

    /// Later record sharing the key
    pub discarded: Record,

    /// Human-readable reason
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeduplicationOutcome {
    /// Survivors, ascending by date
    pub kept: Vec<Record>,

    pub duplicates: Vec<DuplicateMatch>,
}

// ============================================================================
// DEDUPLICATION ENGINE
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct DeduplicationEngine;

impl DeduplicationEngine {
    pub fn new() -> Self {
        DeduplicationEngine
    }

    /// Deduplicate one year's selected records
    pub fn deduplicate(&self, mut records: Vec<Record>, log: &dyn LogSink) -> DeduplicationOutcome {
        records.sort_by(|a, b| a.chronological_cmp(b));

        let mut first_seen: HashMap<RecordKey, usize> = HashMap::new();
        let mut outcome = DeduplicationOutcome::default();

        for record in records {
            match first_seen.get(&record.key()) {
                Some(&idx) => {
                    let kept = &outcome.kept[idx];
                    let reason = format!(
                        "{} @ {}: kept {} ({}), dropped {} ({})",
                        record.function_code(),
                        record.location(),
                        kept.date(),
                        kept.source(),
                        record.date(),
                        record.source()
                    );
                    log.debug(&format!("Duplicate discarded: {}", reason));
                    outcome.duplicates.push(DuplicateMatch {
                        kept: kept.clone(),
                        discarded: record,
                        reason,
                    });
                }
                None => {
                    first_seen.insert(record.key(), outcome.kept.len());
                    outcome.kept.push(record);
                }
            }
        }

        outcome
    }
}

// ============================================================================
// TESTS
// ============================================================================
