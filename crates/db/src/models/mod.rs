pub mod job;

pub use job::{DeliveryMode, Job, JobStatus, NewJob, OutputFormat};
