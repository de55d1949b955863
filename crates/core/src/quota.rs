//! Skill-quota allocation over a prioritized contact list.
//!
//! Reorders an already-ranked list so that each skill quota is filled from
//! the highest-ranked holders of that skill before anyone else is messaged.
//! A contact is claimed by at most one quota and no quota is ever
//! over-filled; contacts no quota claims keep their original relative order
//! at the tail.

use crate::error::CoreError;
use crate::types::DbId;

/// One skill requirement as declared on the job (structured row or parsed
/// from notes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillRequirement {
    pub skill: String,
    pub headcount: i32,
}

/// A merged quota keyed by lowercased skill label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillQuota {
    pub key: String,
    pub headcount: i32,
}

/// A contact in ranked order, with the skills the allocator may claim on.
#[derive(Debug, Clone)]
pub struct QuotaCandidate {
    pub contact_id: DbId,
    pub skills: Vec<String>,
}

/// Merge raw requirements into quotas: case-insensitive skill key, summed
/// headcounts, first-seen order preserved.
///
/// Empty labels and non-positive headcounts are malformed input and fail
/// validation before any allocation happens.
pub fn merge_requirements(
    requirements: &[SkillRequirement],
) -> Result<Vec<SkillQuota>, CoreError> {
    let mut quotas: Vec<SkillQuota> = Vec::new();
    for req in requirements {
        let key = req.skill.trim().to_lowercase();
        if key.is_empty() {
            return Err(CoreError::Validation(
                "skill requirement has an empty label".to_string(),
            ));
        }
        if req.headcount <= 0 {
            return Err(CoreError::Validation(format!(
                "skill requirement {:?} has non-positive headcount {}",
                req.skill, req.headcount
            )));
        }
        match quotas.iter_mut().find(|q| q.key == key) {
            Some(quota) => quota.headcount += req.headcount,
            None => quotas.push(SkillQuota { key, headcount: req.headcount }),
        }
    }
    Ok(quotas)
}

/// Produce the final dispatch order: quota claims first (in quota input
/// order, each filled greedily from the ranked list), unclaimed contacts
/// appended in their original relative order.
pub fn allocate(
    candidates: &[QuotaCandidate],
    requirements: &[SkillRequirement],
) -> Result<Vec<DbId>, CoreError> {
    let quotas = merge_requirements(requirements)?;

    let mut claimed = vec![false; candidates.len()];
    let mut order: Vec<DbId> = Vec::with_capacity(candidates.len());

    for quota in &quotas {
        let mut open = quota.headcount;
        for (idx, candidate) in candidates.iter().enumerate() {
            if open == 0 {
                break;
            }
            if claimed[idx] {
                continue;
            }
            let holds_skill = candidate
                .skills
                .iter()
                .any(|s| s.trim().eq_ignore_ascii_case(&quota.key));
            if holds_skill {
                claimed[idx] = true;
                order.push(candidate.contact_id);
                open -= 1;
            }
        }
    }

    for (idx, candidate) in candidates.iter().enumerate() {
        if !claimed[idx] {
            order.push(candidate.contact_id);
        }
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn req(skill: &str, headcount: i32) -> SkillRequirement {
        SkillRequirement { skill: skill.to_string(), headcount }
    }

    fn candidate(id: DbId, skills: &[&str]) -> QuotaCandidate {
        QuotaCandidate {
            contact_id: id,
            skills: skills.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn merge_sums_case_insensitive_duplicates() {
        let quotas =
            merge_requirements(&[req("Forklift", 2), req("forklift ", 1), req("rigger", 1)])
                .unwrap();
        assert_eq!(
            quotas,
            vec![
                SkillQuota { key: "forklift".to_string(), headcount: 3 },
                SkillQuota { key: "rigger".to_string(), headcount: 1 },
            ]
        );
    }

    #[test]
    fn merge_rejects_empty_label() {
        let err = merge_requirements(&[req("  ", 1)]).unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
    }

    #[test]
    fn merge_rejects_non_positive_headcount() {
        let err = merge_requirements(&[req("forklift", 0)]).unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
    }

    #[test]
    fn quota_claims_highest_ranked_holders_first() {
        let order = allocate(
            &[
                candidate(1, &["rigger"]),
                candidate(2, &["forklift"]),
                candidate(3, &["forklift"]),
            ],
            &[req("forklift", 1)],
        )
        .unwrap();
        // Contact 2 is the best-ranked forklift holder; 1 and 3 keep their
        // relative order behind the claim.
        assert_eq!(order, vec![2, 1, 3]);
    }

    #[test]
    fn quota_never_overfills() {
        let order = allocate(
            &[
                candidate(1, &["forklift"]),
                candidate(2, &["forklift"]),
                candidate(3, &["forklift"]),
            ],
            &[req("forklift", 2)],
        )
        .unwrap();
        assert_eq!(order, vec![1, 2, 3]);
        // The first two are quota claims; the third is tail, not a claim.
        let quotas = merge_requirements(&[req("forklift", 2)]).unwrap();
        assert_eq!(quotas[0].headcount, 2);
    }

    #[test]
    fn contact_claimed_by_at_most_one_quota() {
        let order = allocate(
            &[candidate(1, &["forklift", "rigger"]), candidate(2, &["rigger"])],
            &[req("forklift", 1), req("rigger", 1)],
        )
        .unwrap();
        // Contact 1 goes to the forklift quota; rigger falls to contact 2.
        assert_eq!(order, vec![1, 2]);
    }

    #[test]
    fn unsatisfiable_quota_just_claims_what_exists() {
        let order = allocate(
            &[candidate(1, &["rigger"]), candidate(2, &["forklift"])],
            &[req("forklift", 5)],
        )
        .unwrap();
        assert_eq!(order, vec![2, 1]);
    }

    #[test]
    fn no_requirements_preserves_order() {
        let order = allocate(
            &[candidate(3, &[]), candidate(1, &[]), candidate(2, &[])],
            &[],
        )
        .unwrap();
        assert_eq!(order, vec![3, 1, 2]);
    }

    #[test]
    fn skill_match_is_case_insensitive() {
        let order = allocate(
            &[candidate(1, &["First Aid"]), candidate(2, &[])],
            &[req("first aid", 1)],
        )
        .unwrap();
        assert_eq!(order, vec![1, 2]);
    }
}
