//! Free-text parsers for skill hints and blackout date ranges.
//!
//! Both parsers exist for legacy data only: jobs created through the current
//! product carry structured `job_skill_requirements` rows, and contacts carry
//! structured blackout ranges where available. Older records embed the same
//! information in notes fields, so these parsers turn that text into the
//! structured forms the prioritizer and allocator consume. They are pure and
//! never touch the database.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::interval::DateRange;
use crate::quota::SkillRequirement;

/// `skills: forklift, first aid` or `skill - rigging; welding`.
fn skill_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?im)^\s*skills?\s*[:\-]\s*(.+)$").unwrap())
}

/// `2x forklift`, `3 x first aid`, `2× rigger`.
fn headcount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d+)\s*[x×]\s*([a-z][a-z0-9 \-]*[a-z0-9])").unwrap()
    })
}

/// ISO dates (`2026-09-01`) and day-first slash dates (`01/09/2026`).
fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{4}-\d{2}-\d{2})|(\d{1,2}/\d{1,2}/\d{4})").unwrap())
}

/// `<date> to <date>`, `<date> - <date>`, `<date> until <date>`.
fn range_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(\d{4}-\d{2}-\d{2}|\d{1,2}/\d{1,2}/\d{4})\s*(?:to|until|through|[-–])\s*(\d{4}-\d{2}-\d{2}|\d{1,2}/\d{1,2}/\d{4})",
        )
        .unwrap()
    })
}

/// Extract a flat, deduplicated, lowercased skill list from free text.
pub fn parse_skill_hints(notes: &str) -> Vec<String> {
    let mut skills = Vec::new();
    for cap in skill_line_re().captures_iter(notes) {
        for part in cap[1].split([',', ';']) {
            let skill = part.trim().to_lowercase();
            if !skill.is_empty() && !skills.contains(&skill) {
                skills.push(skill);
            }
        }
    }
    skills
}

/// Extract skill requirements with headcounts from free text.
///
/// `2x forklift` patterns yield explicit headcounts; skills listed on a
/// `skills:` line without a count default to headcount 1. A skill named both
/// ways keeps its explicit count.
pub fn parse_skill_requirements(notes: &str) -> Vec<SkillRequirement> {
    let mut reqs: Vec<SkillRequirement> = Vec::new();

    for cap in headcount_re().captures_iter(notes) {
        let headcount: i32 = cap[1].parse().unwrap_or(0);
        let skill = cap[2].trim().to_lowercase();
        if headcount > 0 && !skill.is_empty() {
            push_requirement(&mut reqs, skill, headcount);
        }
    }

    for skill in parse_skill_hints(notes) {
        if !reqs.iter().any(|r| r.skill == skill) {
            reqs.push(SkillRequirement { skill, headcount: 1 });
        }
    }

    reqs
}

fn push_requirement(reqs: &mut Vec<SkillRequirement>, skill: String, headcount: i32) {
    match reqs.iter_mut().find(|r| r.skill == skill) {
        Some(existing) => existing.headcount += headcount,
        None => reqs.push(SkillRequirement { skill, headcount }),
    }
}

/// Parse blackout date ranges out of free text.
///
/// Recognizes `2026-09-01 to 2026-09-05`, `01/09/2026 - 05/09/2026`
/// (day-first), and bare dates, which become one-day ranges. Reversed ranges
/// and unparseable fragments are skipped rather than rejected: blackout notes
/// are contact-authored text and a bad fragment must not poison the rest.
pub fn parse_blackout_ranges(text: &str) -> Vec<DateRange> {
    let mut ranges = Vec::new();
    let mut consumed: Vec<(usize, usize)> = Vec::new();

    for cap in range_re().captures_iter(text) {
        let whole = cap.get(0).unwrap();
        if let (Some(start), Some(end)) = (parse_date(&cap[1]), parse_date(&cap[2])) {
            if start <= end {
                ranges.push(DateRange { start, end });
                consumed.push((whole.start(), whole.end()));
            }
        }
    }

    // Bare dates not already part of a matched range become one-day windows.
    for m in date_re().find_iter(text) {
        let inside_range = consumed
            .iter()
            .any(|&(start, end)| m.start() >= start && m.end() <= end);
        if inside_range {
            continue;
        }
        if let Some(day) = parse_date(m.as_str()) {
            ranges.push(DateRange::single(day));
        }
    }

    ranges
}

fn parse_date(token: &str) -> Option<NaiveDate> {
    if token.contains('/') {
        NaiveDate::parse_from_str(token, "%d/%m/%Y").ok()
    } else {
        NaiveDate::parse_from_str(token, "%Y-%m-%d").ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    // -----------------------------------------------------------------------
    // Skill parsing
    // -----------------------------------------------------------------------

    #[test]
    fn skills_line_comma_separated() {
        let skills = parse_skill_hints("Skills: Forklift, First Aid, rigging");
        assert_eq!(skills, vec!["forklift", "first aid", "rigging"]);
    }

    #[test]
    fn skills_line_dedupes_case_insensitively() {
        let skills = parse_skill_hints("skills: Forklift; forklift; FORKLIFT");
        assert_eq!(skills, vec!["forklift"]);
    }

    #[test]
    fn no_skills_line_yields_empty() {
        assert!(parse_skill_hints("Bring safety boots. Gate 3 entry.").is_empty());
    }

    #[test]
    fn headcount_patterns_parse() {
        let reqs = parse_skill_requirements("Need 2x forklift and 3 x First Aid on site");
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0].skill, "forklift");
        assert_eq!(reqs[0].headcount, 2);
        assert_eq!(reqs[1].skill, "first aid");
        assert_eq!(reqs[1].headcount, 3);
    }

    #[test]
    fn hint_skills_default_to_headcount_one() {
        let reqs = parse_skill_requirements("skills: rigging\n2x forklift");
        assert_eq!(reqs.len(), 2);
        let rigging = reqs.iter().find(|r| r.skill == "rigging").unwrap();
        assert_eq!(rigging.headcount, 1);
    }

    #[test]
    fn explicit_count_wins_over_hint_listing() {
        let reqs = parse_skill_requirements("skills: forklift\nalso need 4x forklift");
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].headcount, 4);
    }

    // -----------------------------------------------------------------------
    // Blackout parsing
    // -----------------------------------------------------------------------

    #[test]
    fn iso_range_with_to() {
        let ranges = parse_blackout_ranges("away 2026-09-01 to 2026-09-05");
        assert_eq!(
            ranges,
            vec![DateRange { start: date("2026-09-01"), end: date("2026-09-05") }]
        );
    }

    #[test]
    fn slash_dates_are_day_first() {
        let ranges = parse_blackout_ranges("01/09/2026 - 05/09/2026");
        assert_eq!(
            ranges,
            vec![DateRange { start: date("2026-09-01"), end: date("2026-09-05") }]
        );
    }

    #[test]
    fn bare_date_becomes_single_day() {
        let ranges = parse_blackout_ranges("unavailable 2026-12-25");
        assert_eq!(ranges, vec![DateRange::single(date("2026-12-25"))]);
    }

    #[test]
    fn multiple_ranges_in_one_note() {
        let ranges =
            parse_blackout_ranges("2026-09-01 to 2026-09-03, then again 2026-10-10 until 2026-10-12");
        assert_eq!(ranges.len(), 2);
    }

    #[test]
    fn reversed_range_is_skipped() {
        let ranges = parse_blackout_ranges("2026-09-05 to 2026-09-01");
        // The reversed pair is dropped; the bare dates fall back to single days.
        assert!(ranges.iter().all(|r| r.start <= r.end));
    }

    #[test]
    fn garbage_yields_nothing() {
        assert!(parse_blackout_ranges("call me whenever").is_empty());
    }
}
