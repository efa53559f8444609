pub mod attachment;
pub mod client;
pub mod error;
pub mod models;
pub mod normalize;
pub mod poller;
pub mod status;

// Re-export commonly used types
pub use attachment::Attachment;
pub use client::{MultipartPayload, Payload, ProviderOutput, RemoteJobClient, Submission, Submit};
pub use error::JobError;
pub use models::{Job, JobKind, JobResult, ResultKind};
pub use poller::{poll_until_terminal, PollConfig};
pub use status::{HttpStatusFetcher, StatusFetcher, PREDICTION_STATUS};
