//! Job entity model: the unit of work tracked end-to-end by the relay.

use relay_core::types::{JobId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Define an enum stored as lowercase text in the database.
///
/// Generates `as_str`, `Display`, `FromStr`, and `TryFrom<String>` (the
/// latter is what `#[sqlx(try_from = "String")]` uses when decoding rows).
macro_rules! define_text_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant ),+
        }

        impl $name {
            /// Text form stored in the `jobs` table.
            pub fn as_str(self) -> &'static str {
                match self { $( Self::$variant => $text ),+ }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $text => Ok(Self::$variant), )+
                    other => Err(format!(
                        concat!("unknown ", stringify!($name), " value: {}"),
                        other
                    )),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

define_text_enum! {
    /// Job lifecycle status.
    ///
    /// Monotonic except that `running` may be observed zero or more times
    /// before `completed`.
    JobStatus {
        PendingSubmission = "pending_submission",
        Queued = "queued",
        Running = "running",
        Completed = "completed",
        SubmissionFailed = "submission_failed",
    }
}

define_text_enum! {
    /// How the formatted result is delivered to the caller.
    DeliveryMode {
        /// Streamed over a WebSocket the caller opened for this job.
        Push = "push",
        /// A single HTTP POST to the caller-supplied URL.
        Webhook = "webhook",
    }
}

define_text_enum! {
    /// Requested shape of the result payload.
    OutputFormat {
        Text = "text",
        FileReference = "file_reference",
        Binary = "binary",
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Binary
    }
}

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub job_id: JobId,
    /// Caller-supplied correlation identifier. Not unique.
    pub external_execution_id: String,
    /// Backend-assigned run identifier; set once on acceptance.
    pub comfy_prompt_id: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: JobStatus,
    #[sqlx(try_from = "String")]
    pub delivery_mode: DeliveryMode,
    /// Destination URL when `delivery_mode = webhook`.
    pub delivery_target: Option<String>,
    #[sqlx(try_from = "String")]
    pub output_format: OutputFormat,
    /// Raw backend output description, set exactly once at completion.
    pub result_manifest: Option<serde_json::Value>,
    pub created_at: Timestamp,
}

/// Fields needed to insert a new job in `pending_submission` status.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub job_id: JobId,
    pub external_execution_id: String,
    pub delivery_mode: DeliveryMode,
    pub delivery_target: Option<String>,
    pub output_format: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            JobStatus::PendingSubmission,
            JobStatus::Queued,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::SubmissionFailed,
        ] {
            let parsed: JobStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = "cancelled".parse::<JobStatus>().unwrap_err();
        assert!(err.contains("cancelled"));
    }

    #[test]
    fn delivery_mode_round_trips() {
        assert_eq!("push".parse::<DeliveryMode>().unwrap(), DeliveryMode::Push);
        assert_eq!(
            "webhook".parse::<DeliveryMode>().unwrap(),
            DeliveryMode::Webhook
        );
    }

    #[test]
    fn output_format_defaults_to_binary() {
        assert_eq!(OutputFormat::default(), OutputFormat::Binary);
    }

    #[test]
    fn status_serializes_as_snake_case() {
        let json = serde_json::to_string(&JobStatus::PendingSubmission).unwrap();
        assert_eq!(json, "\"pending_submission\"");
    }
}
