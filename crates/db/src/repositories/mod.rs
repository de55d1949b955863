//! Repository layer: one unit struct per table, static async fns, no
//! business logic.

mod account_repo;
mod availability_repo;
mod campaign_batch_repo;
mod campaign_repo;
mod contact_repo;
mod credit_grant_repo;
mod credit_transaction_repo;
mod job_repo;
mod message_log_repo;
mod message_repo;
mod push_delivery_repo;

pub use account_repo::AccountRepo;
pub use availability_repo::AvailabilityRepo;
pub use campaign_batch_repo::CampaignBatchRepo;
pub use campaign_repo::CampaignRepo;
pub use contact_repo::ContactRepo;
pub use credit_grant_repo::CreditGrantRepo;
pub use credit_transaction_repo::CreditTransactionRepo;
pub use job_repo::JobRepo;
pub use message_log_repo::MessageLogRepo;
pub use message_repo::MessageRepo;
pub use push_delivery_repo::PushDeliveryRepo;
