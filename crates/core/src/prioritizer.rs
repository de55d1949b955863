//! Contact prioritization for campaign dispatch.
//!
//! Ranks candidate contacts for a job on four boolean criteria (location,
//! no blackout, no schedule conflict, skills) with a weighted score used only
//! for ordering. The caller assembles the inputs: batched distance lookups,
//! confirmed-availability conflict flags, and parsed blackout ranges all
//! happen in the dispatch layer so this module stays pure.

use std::cmp::Ordering;

use crate::interval::{day_extended, DateRange};
use crate::types::{DbId, Timestamp};

/// Default distance threshold for a location match.
pub const DEFAULT_MAX_MATCH_DISTANCE_METERS: f64 = 50_000.0;

/// Criterion weights. Location and skills dominate: a nearby qualified
/// contact beats an unconflicted distant one.
pub const WEIGHT_LOCATION: u32 = 3;
pub const WEIGHT_NO_BLACKOUT: u32 = 2;
pub const WEIGHT_NO_CONFLICT: u32 = 2;
pub const WEIGHT_SKILLS: u32 = 3;

/// Tokens shorter than this are too ambiguous for the fallback location
/// match ("st", "rd", "of").
const MIN_LOCATION_TOKEN_LEN: usize = 3;

/// The job-side inputs to ranking.
#[derive(Debug, Clone)]
pub struct JobProfile {
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub location: String,
    /// Lowercased required skill labels (from structured quotas when present,
    /// else parsed from notes).
    pub required_skills: Vec<String>,
}

/// The per-contact inputs to ranking, pre-assembled by the dispatch layer.
#[derive(Debug, Clone)]
pub struct CandidateProfile {
    pub contact_id: DbId,
    pub skills: Vec<String>,
    pub address: String,
    pub tags: Vec<String>,
    pub blackout: Vec<DateRange>,
    /// Road distance to the job, when the distance provider resolved one.
    pub distance_meters: Option<f64>,
    /// The contact already has a confirmed availability whose job interval
    /// overlaps this job's interval.
    pub has_confirmed_conflict: bool,
    pub opted_out: bool,
}

/// One ranked contact.
#[derive(Debug, Clone)]
pub struct RankedContact {
    pub contact_id: DbId,
    pub priority_score: u32,
    pub meets_all_criteria: bool,
    pub distance_meters: Option<f64>,
    /// Blackout overlap is a soft criterion for ranking but a hard filter for
    /// sends; `dispatch_eligible` drops these.
    pub in_blackout: bool,
}

/// Rank candidates for a job.
///
/// Opted-out contacts are dropped. Contacts meeting all four criteria come
/// first (score desc, then distance asc); the rest form a fallback pool
/// ordered by distance asc, then score desc. Unknown distances sort last
/// within their group.
pub fn rank(
    job: &JobProfile,
    candidates: &[CandidateProfile],
    max_distance_meters: f64,
) -> Vec<RankedContact> {
    let job_days = day_extended(job.start_time, job.end_time);

    let mut ranked: Vec<RankedContact> = candidates
        .iter()
        .filter(|c| !c.opted_out)
        .map(|c| score_candidate(job, &job_days, c, max_distance_meters))
        .collect();

    let (mut qualified, mut fallback): (Vec<_>, Vec<_>) =
        ranked.drain(..).partition(|r| r.meets_all_criteria);

    qualified.sort_by(|a, b| {
        b.priority_score
            .cmp(&a.priority_score)
            .then_with(|| cmp_distance(a.distance_meters, b.distance_meters))
            .then_with(|| a.contact_id.cmp(&b.contact_id))
    });
    fallback.sort_by(|a, b| {
        cmp_distance(a.distance_meters, b.distance_meters)
            .then_with(|| b.priority_score.cmp(&a.priority_score))
            .then_with(|| a.contact_id.cmp(&b.contact_id))
    });

    qualified.extend(fallback);
    qualified
}

/// Contacts allowed to receive campaign sends, in ranked order.
///
/// Blackout overlap disqualifies outright here, regardless of score.
pub fn dispatch_eligible(ranked: &[RankedContact]) -> Vec<DbId> {
    ranked
        .iter()
        .filter(|r| !r.in_blackout)
        .map(|r| r.contact_id)
        .collect()
}

fn score_candidate(
    job: &JobProfile,
    job_days: &DateRange,
    candidate: &CandidateProfile,
    max_distance_meters: f64,
) -> RankedContact {
    let location_match = match candidate.distance_meters {
        Some(d) => d < max_distance_meters,
        None => location_token_match(&job.location, candidate),
    };

    let in_blackout = candidate.blackout.iter().any(|r| r.overlaps(job_days));
    let no_conflict = !candidate.has_confirmed_conflict;
    let skills_match = has_all_skills(&candidate.skills, &job.required_skills);

    let mut score = 0;
    if location_match {
        score += WEIGHT_LOCATION;
    }
    if !in_blackout {
        score += WEIGHT_NO_BLACKOUT;
    }
    if no_conflict {
        score += WEIGHT_NO_CONFLICT;
    }
    if skills_match {
        score += WEIGHT_SKILLS;
    }

    RankedContact {
        contact_id: candidate.contact_id,
        priority_score: score,
        meets_all_criteria: location_match && !in_blackout && no_conflict && skills_match,
        distance_meters: candidate.distance_meters,
        in_blackout,
    }
}

/// Superset test over case-insensitive skill labels.
fn has_all_skills(contact_skills: &[String], required: &[String]) -> bool {
    required.iter().all(|req| {
        contact_skills
            .iter()
            .any(|s| s.eq_ignore_ascii_case(req.trim()))
    })
}

/// Token-overlap fallback when no distance is available: any substantial
/// token of the job location appearing in the contact's address or tags.
fn location_token_match(job_location: &str, candidate: &CandidateProfile) -> bool {
    let contact_text = {
        let mut text = candidate.address.to_lowercase();
        for tag in &candidate.tags {
            text.push(' ');
            text.push_str(&tag.to_lowercase());
        }
        text
    };
    let contact_tokens: Vec<&str> = contact_text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= MIN_LOCATION_TOKEN_LEN)
        .collect();

    job_location
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= MIN_LOCATION_TOKEN_LEN)
        .any(|job_token| contact_tokens.contains(&job_token))
}

fn cmp_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    a.unwrap_or(f64::INFINITY).total_cmp(&b.unwrap_or(f64::INFINITY))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> Timestamp {
        chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")
            .unwrap()
            .and_utc()
    }

    fn job() -> JobProfile {
        JobProfile {
            start_time: ts("2026-09-10 08:00"),
            end_time: ts("2026-09-10 18:00"),
            location: "12 Harbour Street, Portsmouth".to_string(),
            required_skills: vec!["forklift".to_string()],
        }
    }

    fn candidate(id: DbId) -> CandidateProfile {
        CandidateProfile {
            contact_id: id,
            skills: vec!["forklift".to_string()],
            address: "Portsmouth".to_string(),
            tags: vec![],
            blackout: vec![],
            distance_meters: Some(5_000.0),
            has_confirmed_conflict: false,
            opted_out: false,
        }
    }

    fn blackout(range: &str) -> Vec<crate::interval::DateRange> {
        crate::notes::parse_blackout_ranges(range)
    }

    #[test]
    fn full_match_scores_all_weights() {
        let ranked = rank(&job(), &[candidate(1)], DEFAULT_MAX_MATCH_DISTANCE_METERS);
        assert_eq!(ranked.len(), 1);
        assert_eq!(
            ranked[0].priority_score,
            WEIGHT_LOCATION + WEIGHT_NO_BLACKOUT + WEIGHT_NO_CONFLICT + WEIGHT_SKILLS
        );
        assert!(ranked[0].meets_all_criteria);
    }

    #[test]
    fn meets_all_ranks_above_partial_at_equal_distance() {
        let mut partial = candidate(2);
        partial.skills.clear(); // loses the skills criterion only
        let ranked = rank(
            &job(),
            &[partial, candidate(1)],
            DEFAULT_MAX_MATCH_DISTANCE_METERS,
        );
        assert_eq!(ranked[0].contact_id, 1);
        assert!(ranked[0].meets_all_criteria);
        assert!(!ranked[1].meets_all_criteria);
    }

    #[test]
    fn opted_out_contacts_are_dropped() {
        let mut c = candidate(1);
        c.opted_out = true;
        let ranked = rank(&job(), &[c], DEFAULT_MAX_MATCH_DISTANCE_METERS);
        assert!(ranked.is_empty());
    }

    #[test]
    fn blackout_overlap_marks_and_filters() {
        let mut c = candidate(1);
        c.blackout = blackout("2026-09-08 to 2026-09-12");
        let ranked = rank(
            &job(),
            &[c, candidate(2)],
            DEFAULT_MAX_MATCH_DISTANCE_METERS,
        );
        let flagged = ranked.iter().find(|r| r.contact_id == 1).unwrap();
        assert!(flagged.in_blackout);
        assert!(!flagged.meets_all_criteria);
        assert_eq!(dispatch_eligible(&ranked), vec![2]);
    }

    #[test]
    fn blackout_outside_job_days_does_not_flag() {
        let mut c = candidate(1);
        c.blackout = blackout("2026-09-20 to 2026-09-25");
        let ranked = rank(&job(), &[c], DEFAULT_MAX_MATCH_DISTANCE_METERS);
        assert!(!ranked[0].in_blackout);
    }

    #[test]
    fn confirmed_conflict_loses_criterion() {
        let mut c = candidate(1);
        c.has_confirmed_conflict = true;
        let ranked = rank(&job(), &[c], DEFAULT_MAX_MATCH_DISTANCE_METERS);
        assert!(!ranked[0].meets_all_criteria);
        assert_eq!(
            ranked[0].priority_score,
            WEIGHT_LOCATION + WEIGHT_NO_BLACKOUT + WEIGHT_SKILLS
        );
    }

    #[test]
    fn distance_over_threshold_fails_location() {
        let mut c = candidate(1);
        c.distance_meters = Some(80_000.0);
        let ranked = rank(&job(), &[c], DEFAULT_MAX_MATCH_DISTANCE_METERS);
        assert!(!ranked[0].meets_all_criteria);
    }

    #[test]
    fn token_fallback_matches_when_distance_unknown() {
        let mut c = candidate(1);
        c.distance_meters = None;
        c.address = "4 Quay Road, Portsmouth".to_string();
        let ranked = rank(&job(), &[c], DEFAULT_MAX_MATCH_DISTANCE_METERS);
        assert!(ranked[0].meets_all_criteria);
    }

    #[test]
    fn token_fallback_checks_tags_too() {
        let mut c = candidate(1);
        c.distance_meters = None;
        c.address = "somewhere else entirely".to_string();
        c.tags = vec!["portsmouth".to_string()];
        let ranked = rank(&job(), &[c], DEFAULT_MAX_MATCH_DISTANCE_METERS);
        assert!(ranked[0].meets_all_criteria);
    }

    #[test]
    fn qualified_ties_break_by_distance() {
        let mut near = candidate(1);
        near.distance_meters = Some(1_000.0);
        let mut far = candidate(2);
        far.distance_meters = Some(20_000.0);
        let ranked = rank(&job(), &[far, near], DEFAULT_MAX_MATCH_DISTANCE_METERS);
        assert_eq!(ranked[0].contact_id, 1);
        assert_eq!(ranked[1].contact_id, 2);
    }

    #[test]
    fn fallback_pool_orders_by_distance_then_score() {
        // Neither meets skills; both land in the fallback pool.
        let mut far = candidate(1);
        far.skills.clear();
        far.distance_meters = Some(90_000.0);
        let mut farther = candidate(2);
        farther.skills.clear();
        farther.distance_meters = Some(120_000.0);
        let ranked = rank(
            &job(),
            &[farther, far],
            DEFAULT_MAX_MATCH_DISTANCE_METERS,
        );
        assert_eq!(ranked[0].contact_id, 1);
    }

    #[test]
    fn unknown_distance_sorts_last_in_group() {
        let known = candidate(1);
        let mut unknown = candidate(2);
        unknown.distance_meters = None;
        unknown.address = "Portsmouth".to_string();
        let ranked = rank(
            &job(),
            &[unknown, known],
            DEFAULT_MAX_MATCH_DISTANCE_METERS,
        );
        // Equal scores; the contact with a resolved distance wins the tie.
        assert_eq!(ranked[0].contact_id, 1);
    }
}
