//! Campaign orchestration: plan the contact queue, run time-spaced batches,
//! and source replacements when confirmed contacts drop out.
//!
//! A campaign starts with one inline batch; every later batch is a durable
//! `campaign_batches` row claimed by the worker, so a restart mid-campaign
//! loses nothing. Before each deferred batch the job's liveness and
//! fulfillment are re-checked, which is why early replies shrink the total
//! send count.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use shiftline_core::interval::DateRange;
use shiftline_core::notes::{parse_blackout_ranges, parse_skill_requirements};
use shiftline_core::prioritizer::{self, CandidateProfile, JobProfile};
use shiftline_core::quota::{self, QuotaCandidate, SkillRequirement};
use shiftline_core::types::DbId;
use shiftline_core::CoreError;
use shiftline_db::models::{
    AvailabilityStatus, Campaign, CampaignKind, CampaignStatus, Contact, ContactStatus, Job,
    JobStatus,
};
use shiftline_db::repositories::{
    AvailabilityRepo, CampaignBatchRepo, CampaignRepo, ContactRepo, JobRepo,
};
use shiftline_db::DbPool;
use tracing::{error, info, warn};

use crate::channel::{DeliveryChannelRouter, DeliveryOutcome};
use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::ledger::CreditLedger;
use crate::providers::DistanceProvider;

/// Where a campaign's message body comes from.
#[derive(Debug, Clone)]
pub enum MessageSource {
    /// A named template with `{placeholder}` substitution from job fields.
    Template { name: String, body: String },
    /// Verbatim text supplied by the caller.
    Custom(String),
}

impl MessageSource {
    /// Render the body, substituting job placeholders where present.
    fn render(&self, job: &Job) -> String {
        let raw = match self {
            MessageSource::Template { body, .. } => body.as_str(),
            MessageSource::Custom(body) => body.as_str(),
        };
        raw.replace("{job_title}", &job.title)
            .replace("{location}", &job.location)
            .replace("{start_time}", &job.start_time.format("%Y-%m-%d %H:%M").to_string())
            .replace("{end_time}", &job.end_time.format("%Y-%m-%d %H:%M").to_string())
    }
}

/// What one batch actually did.
#[derive(Debug, Default, Clone, Copy)]
pub struct DispatchSummary {
    /// Contacts attempted in this batch.
    pub queued: usize,
    pub portal_sent: usize,
    pub push_sent: usize,
    pub sms_sent: usize,
    pub failed: usize,
    /// Credits debited for this batch.
    pub credits_spent: i64,
}

/// Outcome of cancelling a confirmed assignment.
#[derive(Debug, Clone)]
pub struct CancelOutcome {
    /// Contact ids invited as replacements.
    pub replacements_invited: Vec<DbId>,
}

pub struct CampaignDispatcher {
    pool: DbPool,
    router: Arc<DeliveryChannelRouter>,
    ledger: Arc<CreditLedger>,
    distance: Arc<dyn DistanceProvider>,
    config: DispatchConfig,
}

impl CampaignDispatcher {
    pub fn new(
        pool: DbPool,
        router: Arc<DeliveryChannelRouter>,
        ledger: Arc<CreditLedger>,
        distance: Arc<dyn DistanceProvider>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            pool,
            router,
            ledger,
            distance,
            config,
        }
    }

    // ------------------------------------------------------------------
    // Campaign start
    // ------------------------------------------------------------------

    /// Plan and start a job-invitation campaign: rank the candidates, apply
    /// skill quotas, persist the queue, and send the first batch inline.
    /// Returns the persisted campaign and the inline batch's summary.
    pub async fn dispatch_campaign(
        &self,
        account_id: DbId,
        job_id: DbId,
        candidate_ids: &[DbId],
        source: MessageSource,
    ) -> Result<(Campaign, DispatchSummary), DispatchError> {
        let job = JobRepo::get_open(&self.pool, job_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "open job",
                id: job_id,
            })?;

        let contacts = ContactRepo::get_many(&self.pool, candidate_ids).await?;
        let requirements = self.job_requirements(&job).await?;
        let queue = self.plan_queue(&job, &contacts, &requirements).await?;

        if queue.is_empty() {
            warn!(job_id, "No eligible contacts for campaign");
        }

        let budget = self.ledger.available_credits(account_id).await?;
        let body = source.render(&job);
        let campaign = CampaignRepo::create(
            &self.pool,
            account_id,
            Some(job_id),
            CampaignKind::JobInvitation,
            &body,
            &queue,
            budget,
        )
        .await?;

        info!(
            campaign_id = campaign.id,
            job_id,
            queued = queue.len(),
            budget,
            "Campaign created"
        );

        let summary = self.run_batch(campaign.id).await?;
        let campaign = CampaignRepo::get(&self.pool, campaign.id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "campaign",
                id: campaign.id,
            })?;
        Ok((campaign, summary))
    }

    /// Structured quota rows when the job has them, else parsed from notes.
    async fn job_requirements(&self, job: &Job) -> Result<Vec<SkillRequirement>, DispatchError> {
        let rows = JobRepo::skill_requirements(&self.pool, job.id).await?;
        if !rows.is_empty() {
            return Ok(rows
                .into_iter()
                .map(|r| SkillRequirement {
                    skill: r.skill,
                    headcount: r.headcount,
                })
                .collect());
        }
        Ok(job
            .notes
            .as_deref()
            .map(parse_skill_requirements)
            .unwrap_or_default())
    }

    /// Rank, filter, and quota-order the candidate contacts into the final
    /// dispatch queue.
    async fn plan_queue(
        &self,
        job: &Job,
        contacts: &[Contact],
        requirements: &[SkillRequirement],
    ) -> Result<Vec<DbId>, DispatchError> {
        let destinations: Vec<(DbId, String)> = contacts
            .iter()
            .filter(|c| !c.address.trim().is_empty())
            .map(|c| (c.id, c.address.clone()))
            .collect();
        let distances = match self.distance.batch_distance(&job.location, &destinations).await {
            Ok(map) => map,
            Err(err) => {
                // Ranking degrades to the token-overlap location fallback.
                warn!(job_id = job.id, error = %err, "Distance lookup failed");
                HashMap::new()
            }
        };

        let contact_ids: Vec<DbId> = contacts.iter().map(|c| c.id).collect();
        let conflicted = AvailabilityRepo::contacts_with_confirmed_conflict(
            &self.pool,
            &contact_ids,
            job.id,
            job.start_time,
            job.end_time,
        )
        .await?;

        let candidates: Vec<CandidateProfile> = contacts
            .iter()
            .map(|c| CandidateProfile {
                contact_id: c.id,
                skills: c.skills.clone(),
                address: c.address.clone(),
                tags: c.tags.clone(),
                blackout: blackouts_for(c),
                distance_meters: distances.get(&c.id).copied(),
                has_confirmed_conflict: conflicted.contains(&c.id),
                opted_out: c.opted_out,
            })
            .collect();

        let profile = JobProfile {
            start_time: job.start_time,
            end_time: job.end_time,
            location: job.location.clone(),
            required_skills: requirements
                .iter()
                .map(|r| r.skill.to_lowercase())
                .collect(),
        };

        let ranked = prioritizer::rank(&profile, &candidates, self.config.max_match_distance_meters);
        let eligible = prioritizer::dispatch_eligible(&ranked);

        let by_id: HashMap<DbId, &Contact> = contacts.iter().map(|c| (c.id, c)).collect();
        let quota_candidates: Vec<QuotaCandidate> = eligible
            .iter()
            .filter_map(|id| by_id.get(id))
            .map(|c| QuotaCandidate {
                contact_id: c.id,
                skills: c.skills.clone(),
            })
            .collect();

        Ok(quota::allocate(&quota_candidates, requirements)?)
    }

    // ------------------------------------------------------------------
    // Batch execution
    // ------------------------------------------------------------------

    /// Run the next batch of a campaign. Called inline at campaign start and
    /// by the worker for every deferred batch.
    pub async fn run_batch(&self, campaign_id: DbId) -> Result<DispatchSummary, DispatchError> {
        let campaign = CampaignRepo::get(&self.pool, campaign_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "campaign",
                id: campaign_id,
            })?;
        if campaign.status != CampaignStatus::Running.as_str() {
            info!(campaign_id, status = %campaign.status, "Skipping batch for inactive campaign");
            return Ok(DispatchSummary::default());
        }

        // Liveness: a cancelled or deleted job kills the campaign, a filled
        // one completes it, and early confirmations can fulfill it before we
        // spend anything on this batch.
        if let Some(job_id) = campaign.job_id {
            match JobRepo::get(&self.pool, job_id).await? {
                None => {
                    warn!(campaign_id, job_id, "Job gone; cancelling campaign");
                    return self.finish(&campaign, CampaignStatus::Cancelled).await;
                }
                Some(job) if job.status == JobStatus::Cancelled.as_str() => {
                    info!(campaign_id, job_id, "Job cancelled; cancelling campaign");
                    return self.finish(&campaign, CampaignStatus::Cancelled).await;
                }
                Some(job) if job.status == JobStatus::Filled.as_str() => {
                    info!(campaign_id, job_id, "Job filled; campaign fulfilled");
                    return self.finish(&campaign, CampaignStatus::Fulfilled).await;
                }
                Some(job) => {
                    if let Some(required) = job.required_headcount {
                        let confirmed =
                            AvailabilityRepo::confirmed_count(&self.pool, job_id).await?;
                        if confirmed >= required as i64 {
                            info!(campaign_id, job_id, confirmed, "Headcount met; campaign fulfilled");
                            return self.finish(&campaign, CampaignStatus::Fulfilled).await;
                        }
                    }
                }
            }
        }

        let cursor = campaign.cursor as usize;
        if cursor >= campaign.contact_queue.len() {
            return self.finish(&campaign, CampaignStatus::Complete).await;
        }

        // Never message more contacts than the remaining budget could pay
        // for if every one of them needed an SMS.
        let batch_size = self
            .config
            .batch_size
            .min(campaign.credits_remaining.max(0) as usize);
        if batch_size == 0 {
            warn!(campaign_id, "Credit budget exhausted before batch");
            return self.finish(&campaign, CampaignStatus::Exhausted).await;
        }

        let slice: Vec<DbId> = campaign.contact_queue[cursor..]
            .iter()
            .take(batch_size)
            .copied()
            .collect();
        let summary = self.send_to_batch(&campaign, &slice).await?;

        let new_cursor = (cursor + slice.len()) as i32;
        let updated = CampaignRepo::record_batch_result(
            &self.pool,
            campaign.id,
            new_cursor,
            summary.credits_spent,
        )
        .await?;

        info!(
            campaign_id,
            queued = summary.queued,
            portal = summary.portal_sent,
            push = summary.push_sent,
            sms = summary.sms_sent,
            failed = summary.failed,
            credits_spent = summary.credits_spent,
            "Batch complete"
        );

        if (updated.cursor as usize) >= updated.contact_queue.len() {
            self.finish(&updated, CampaignStatus::Complete).await?;
        } else if updated.credits_remaining <= 0 {
            self.finish(&updated, CampaignStatus::Exhausted).await?;
        } else {
            let run_after = Utc::now()
                + ChronoDuration::from_std(self.config.batch_delay)
                    .unwrap_or(ChronoDuration::zero());
            CampaignBatchRepo::schedule(&self.pool, campaign.id, run_after).await?;
        }
        Ok(summary)
    }

    /// Deliver one batch and settle its credit cost.
    async fn send_to_batch(
        &self,
        campaign: &Campaign,
        contact_ids: &[DbId],
    ) -> Result<DispatchSummary, DispatchError> {
        let contacts = ContactRepo::get_many(&self.pool, contact_ids).await?;
        let by_id: HashMap<DbId, &Contact> = contacts.iter().map(|c| (c.id, c)).collect();

        let is_invitation = campaign.kind == CampaignKind::JobInvitation.as_str();
        let title = "New shift available";

        let mut summary = DispatchSummary {
            queued: contact_ids.len(),
            ..Default::default()
        };

        for contact_id in contact_ids {
            let Some(contact) = by_id.get(contact_id) else {
                warn!(contact_id, campaign_id = campaign.id, "Queued contact no longer exists");
                continue;
            };

            if is_invitation {
                if let Some(job_id) = campaign.job_id {
                    AvailabilityRepo::upsert_invited(&self.pool, job_id, contact.id).await?;
                }
            }

            match self
                .router
                .deliver(contact, Some(campaign.id), title, &campaign.body)
                .await?
            {
                DeliveryOutcome::Portal => summary.portal_sent += 1,
                DeliveryOutcome::Push => summary.push_sent += 1,
                DeliveryOutcome::Sms => summary.sms_sent += 1,
                DeliveryOutcome::Failed => summary.failed += 1,
            }
        }

        // Only SMS sends cost credits. Push fallbacks are settled separately
        // when they fire.
        if summary.sms_sent > 0 {
            match self
                .ledger
                .consume_credits_atomic(
                    campaign.account_id,
                    summary.sms_sent as i64,
                    "Campaign send",
                    None,
                )
                .await
            {
                Ok(_) => summary.credits_spent = summary.sms_sent as i64,
                Err(DispatchError::Core(CoreError::InsufficientCredits {
                    requested,
                    available,
                })) => {
                    // The messages are already with the provider; record the
                    // shortfall and stop the campaign at settle time.
                    error!(
                        campaign_id = campaign.id,
                        requested, available, "Batch settle found insufficient credits"
                    );
                    summary.credits_spent = campaign.credits_remaining;
                }
                Err(err) => return Err(err),
            }
        }

        Ok(summary)
    }

    /// Close out a campaign: set the terminal status and drop any batches
    /// still scheduled.
    async fn finish(
        &self,
        campaign: &Campaign,
        status: CampaignStatus,
    ) -> Result<DispatchSummary, DispatchError> {
        CampaignRepo::set_status(&self.pool, campaign.id, status).await?;
        let dropped = CampaignBatchRepo::cancel_pending_for_campaign(&self.pool, campaign.id).await?;
        info!(
            campaign_id = campaign.id,
            status = status.as_str(),
            batches_dropped = dropped,
            "Campaign finished"
        );
        Ok(DispatchSummary::default())
    }

    // ------------------------------------------------------------------
    // Cancellation and replacement sourcing
    // ------------------------------------------------------------------

    /// Cancel a confirmed contact's assignment and invite replacements for
    /// the shortfall from the not-yet-invited remainder of the job's ranked
    /// pool.
    pub async fn cancel_contact_assignment(
        &self,
        account_id: DbId,
        job_id: DbId,
        contact_id: DbId,
        reason: &str,
    ) -> Result<CancelOutcome, DispatchError> {
        let job = JobRepo::get(&self.pool, job_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "job",
                id: job_id,
            })?;

        let cancelled = AvailabilityRepo::set_status(
            &self.pool,
            job_id,
            contact_id,
            AvailabilityStatus::Cancelled,
            None,
        )
        .await?;
        if cancelled.is_none() {
            return Err(CoreError::NotFound {
                entity: "availability",
                id: contact_id,
            }
            .into());
        }
        ContactRepo::set_status(&self.pool, contact_id, ContactStatus::Free).await?;
        info!(job_id, contact_id, reason, "Assignment cancelled");

        if job.status != JobStatus::Open.as_str() {
            return Ok(CancelOutcome {
                replacements_invited: Vec::new(),
            });
        }

        let required = job.required_headcount.unwrap_or(0) as i64;
        let confirmed = AvailabilityRepo::confirmed_count(&self.pool, job_id).await?;
        let shortfall = (required - confirmed).max(0) as usize;
        if shortfall == 0 {
            return Ok(CancelOutcome {
                replacements_invited: Vec::new(),
            });
        }

        let replacements = self.invite_replacements(&job, shortfall).await?;
        Ok(CancelOutcome {
            replacements_invited: replacements,
        })
    }

    /// Rank the account's uninvited contacts against the job and invite the
    /// top `count`, paying SMS costs from the account balance.
    async fn invite_replacements(
        &self,
        job: &Job,
        count: usize,
    ) -> Result<Vec<DbId>, DispatchError> {
        let already_invited = AvailabilityRepo::invited_contact_ids(&self.pool, job.id).await?;
        let pool_contacts: Vec<Contact> =
            ContactRepo::list_for_account(&self.pool, job.account_id)
                .await?
                .into_iter()
                .filter(|c| !already_invited.contains(&c.id))
                .collect();
        if pool_contacts.is_empty() {
            warn!(job_id = job.id, "No replacement candidates left");
            return Ok(Vec::new());
        }

        let requirements = self.job_requirements(job).await?;
        let queue = self.plan_queue(job, &pool_contacts, &requirements).await?;
        let picks: Vec<DbId> = queue.into_iter().take(count).collect();

        let body = match CampaignRepo::latest_for_job(&self.pool, job.id).await? {
            Some(campaign) => campaign.body,
            None => MessageSource::Custom(
                "A shift has opened up: {job_title} at {location}. Reply YES to confirm."
                    .to_string(),
            )
            .render(job),
        };

        let by_id: HashMap<DbId, &Contact> = pool_contacts.iter().map(|c| (c.id, c)).collect();
        let mut invited = Vec::with_capacity(picks.len());
        let mut sms_count = 0i64;
        for contact_id in &picks {
            let Some(contact) = by_id.get(contact_id) else {
                continue;
            };
            AvailabilityRepo::upsert_invited(&self.pool, job.id, contact.id).await?;
            let outcome = self
                .router
                .deliver(contact, None, "Replacement shift available", &body)
                .await?;
            if outcome == DeliveryOutcome::Sms {
                sms_count += 1;
            }
            invited.push(contact.id);
        }

        if sms_count > 0 {
            if let Err(DispatchError::Core(CoreError::InsufficientCredits {
                requested,
                available,
            })) = self
                .ledger
                .consume_credits_atomic(job.account_id, sms_count, "Replacement invitation", None)
                .await
            {
                error!(
                    job_id = job.id,
                    requested, available, "Replacement settle found insufficient credits"
                );
            }
        }

        info!(
            job_id = job.id,
            invited = invited.len(),
            "Replacement invitations sent"
        );
        Ok(invited)
    }
}

/// Parse the contact's blackout notes into date ranges, empty when absent.
fn blackouts_for(contact: &Contact) -> Vec<DateRange> {
    contact
        .blackout_notes
        .as_deref()
        .map(parse_blackout_ranges)
        .unwrap_or_default()
}
