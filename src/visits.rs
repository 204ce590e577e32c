//! # Visit Records
//!
//! A deduplicated log of visited places. When the user logs a visit, the
//! [`PlaceMatcher`] decides whether it is a revisit of an existing record
//! (same external place id, or close by with a near-identical name) or a new
//! place. Revisits are merged into the existing record's date list; new places
//! get a fresh record.
//!
//! ## Invariants
//!
//! - `visit_count == visit_dates.len()`
//! - `visit_dates` is sorted ascending
//! - `normalized_name` is computed once, at creation, and never re-derived
//!   (a stored record missing it gets it filled in on load)
//!
//! ## Loading
//!
//! Stored records are decoded one at a time. A record that does not decode is
//! dropped with a warning; the rest of the collection survives.
//!
//! ## First match
//!
//! [`PlaceMatcher::find_match`] returns the first qualifying record in
//! collection order, not the closest one.

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::MatchConfig;
use crate::geo_utils::haversine_distance;
use crate::similarity::{name_similarity, normalize_place_name};
use crate::store::{KeyValueStore, VISITS_KEY};
use crate::{GeoPoint, OptionExt, Result};

/// A place the user has visited one or more times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
    pub place_name: String,
    #[serde(default)]
    pub normalized_name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub note: String,
    pub visit_dates: Vec<DateTime<Utc>>,
    pub visit_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VisitRecord {
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }

    pub fn last_visited(&self) -> Option<DateTime<Utc>> {
        self.visit_dates.last().copied()
    }

    /// Re-sort dates, recount and fill a missing normalized name. Returns
    /// true if anything changed.
    fn repair(&mut self) -> bool {
        let sorted = self.visit_dates.windows(2).all(|w| w[0] <= w[1]);
        let counted = self.visit_count as usize == self.visit_dates.len();
        let named = !self.normalized_name.is_empty() || self.place_name.is_empty();
        if sorted && counted && named {
            return false;
        }
        self.visit_dates.sort();
        self.visit_count = self.visit_dates.len() as u32;
        if !named {
            self.normalized_name = normalize_place_name(&self.place_name);
        }
        true
    }
}

/// A visit the user is about to log.
#[derive(Debug, Clone, PartialEq)]
pub struct VisitCandidate {
    pub lat: f64,
    pub lng: f64,
    pub place_name: String,
    pub note: String,
    pub visited_at: DateTime<Utc>,
    pub place_id: Option<String>,
}

impl VisitCandidate {
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

/// Parse the visit time typed by the user.
///
/// Accepts RFC 3339 (kept as given) or a local `YYYY-MM-DDTHH:MM[:SS]` value
/// (interpreted in the device's time zone). Empty or unparseable input means
/// "now".
pub fn parse_visited_at(input: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    let input = input.trim();
    if input.is_empty() {
        return now;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return dt.with_timezone(&Utc);
    }

    let naive = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M"));

    match naive {
        Ok(naive) => Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(now),
        Err(_) => {
            debug!("[Visits] Unparseable visit time {:?}, using now", input);
            now
        }
    }
}

/// Same-place detection and record construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceMatcher {
    config: MatchConfig,
}

impl PlaceMatcher {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Distance and similarity thresholds, both inclusive.
    pub fn within_thresholds(&self, distance_m: f64, similarity: f64) -> bool {
        distance_m <= self.config.radius_m && similarity >= self.config.sim_threshold
    }

    /// Whether `candidate` is a revisit of `existing`.
    pub fn is_same_place(&self, existing: &VisitRecord, candidate: &VisitCandidate) -> bool {
        if let (Some(a), Some(b)) = (
            non_empty(existing.place_id.as_deref()),
            non_empty(candidate.place_id.as_deref()),
        ) {
            if a == b {
                return true;
            }
        }

        let distance = haversine_distance(&existing.position(), &candidate.position());
        if distance > self.config.radius_m {
            return false;
        }

        let similarity = name_similarity(&existing.place_name, &candidate.place_name);
        self.within_thresholds(distance, similarity)
    }

    /// First record in collection order that `candidate` revisits.
    pub fn find_match<'a>(
        &self,
        visits: &'a [VisitRecord],
        candidate: &VisitCandidate,
    ) -> Option<&'a VisitRecord> {
        visits.iter().find(|v| self.is_same_place(v, candidate))
    }

    /// Build a new record from a candidate.
    pub fn create_visit(&self, candidate: &VisitCandidate, now: DateTime<Utc>) -> VisitRecord {
        VisitRecord {
            id: Uuid::new_v4().to_string(),
            place_id: candidate.place_id.clone(),
            place_name: candidate.place_name.clone(),
            normalized_name: normalize_place_name(&candidate.place_name),
            lat: candidate.lat,
            lng: candidate.lng,
            note: candidate.note.clone(),
            visit_dates: vec![candidate.visited_at],
            visit_count: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Fold a revisit into an existing record.
    ///
    /// The name and normalized name are left untouched; the note is replaced
    /// only by a non-blank one.
    pub fn merge_visit(
        &self,
        record: &mut VisitRecord,
        candidate: &VisitCandidate,
        now: DateTime<Utc>,
    ) {
        record.visit_dates.push(candidate.visited_at);
        record.visit_dates.sort();
        record.visit_count = record.visit_dates.len() as u32;
        if !candidate.note.trim().is_empty() {
            record.note = candidate.note.clone();
        }
        record.updated_at = now;
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

/// Outcome of checking a candidate against the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisitResolution {
    /// Revisit of the record with this id.
    Matched(String),
    /// No existing record matches.
    New,
}

/// The persisted visit collection.
///
/// Every mutation rewrites the whole list. A failed save is logged and the
/// in-memory list stays authoritative. Callers serialize visit logging.
pub struct VisitBook {
    store: Arc<dyn KeyValueStore>,
    matcher: PlaceMatcher,
    visits: Vec<VisitRecord>,
}

impl VisitBook {
    /// Load the collection.
    ///
    /// Absent data or data that is not a JSON array yields an empty book.
    /// Individual records that fail to decode are skipped.
    pub fn load(store: Arc<dyn KeyValueStore>, matcher: PlaceMatcher) -> Self {
        let visits = match store.get(VISITS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<serde_json::Value>>(&raw) {
                Ok(values) => decode_records(values),
                Err(e) => {
                    warn!("[VisitBook] Ignoring malformed visit data: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("[VisitBook] Failed to load visits: {}", e);
                Vec::new()
            }
        };

        debug!("[VisitBook] Loaded {} visits", visits.len());
        Self {
            store,
            matcher,
            visits,
        }
    }

    pub fn visits(&self) -> &[VisitRecord] {
        &self.visits
    }

    pub fn len(&self) -> usize {
        self.visits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&VisitRecord> {
        self.visits.iter().find(|v| v.id == id)
    }

    pub fn find_match(&self, candidate: &VisitCandidate) -> Option<&VisitRecord> {
        self.matcher.find_match(&self.visits, candidate)
    }

    /// Decide whether `candidate` is a revisit. The caller confirms and then
    /// calls [`VisitBook::merge_visit`] or [`VisitBook::create_visit`].
    pub fn resolve(&self, candidate: &VisitCandidate) -> VisitResolution {
        match self.find_match(candidate) {
            Some(record) => VisitResolution::Matched(record.id.clone()),
            None => VisitResolution::New,
        }
    }

    /// Merge a revisit into the record with `existing_id`.
    pub fn merge_visit(
        &mut self,
        existing_id: &str,
        candidate: &VisitCandidate,
    ) -> Result<&VisitRecord> {
        let idx = self
            .visits
            .iter()
            .position(|v| v.id == existing_id)
            .ok_or_invalid(&format!("no visit record with id '{}'", existing_id))?;

        self.matcher
            .merge_visit(&mut self.visits[idx], candidate, Utc::now());
        info!(
            "[VisitBook] Merged visit into '{}' ({} visits)",
            self.visits[idx].place_name, self.visits[idx].visit_count
        );
        self.persist();
        Ok(&self.visits[idx])
    }

    /// Create a record for a new place. New records go to the front.
    pub fn create_visit(&mut self, candidate: &VisitCandidate) -> &VisitRecord {
        let record = self.matcher.create_visit(candidate, Utc::now());
        info!("[VisitBook] New place '{}' ({})", record.place_name, record.id);
        self.visits.insert(0, record);
        self.persist();
        &self.visits[0]
    }

    /// Forget every visit.
    pub fn remove_all(&mut self) {
        self.visits.clear();
        self.persist();
    }

    fn persist(&self) {
        let json = match serde_json::to_string(&self.visits) {
            Ok(json) => json,
            Err(e) => {
                warn!("[VisitBook] Failed to encode visits: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set(VISITS_KEY, &json) {
            warn!("[VisitBook] Failed to save {} visits: {}", self.visits.len(), e);
        }
    }
}

/// Decode stored records one by one, dropping the ones that don't fit.
fn decode_records(values: Vec<serde_json::Value>) -> Vec<VisitRecord> {
    let total = values.len();
    let mut visits: Vec<VisitRecord> = values
        .into_iter()
        .enumerate()
        .filter_map(|(i, value)| match serde_json::from_value::<VisitRecord>(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("[VisitBook] Skipping malformed visit record {}: {}", i, e);
                None
            }
        })
        .collect();

    if visits.len() < total {
        warn!(
            "[VisitBook] Dropped {} of {} stored visit records",
            total - visits.len(),
            total
        );
    }

    let repaired = visits.iter_mut().map(|v| v.repair()).filter(|r| *r).count();
    if repaired > 0 {
        warn!("[VisitBook] Repaired {} inconsistent records", repaired);
    }
    visits
}
