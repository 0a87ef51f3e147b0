//! Output formatting: raw result manifest -> caller-facing payload.
//!
//! The manifest maps producer-node identifiers to typed file references
//! (`images` / `videos` / `audio`, each carrying a filename). Formatting
//! is a function of `(requested_format, manifest)`:
//!
//! * `text` — the manifest serialized verbatim; also the fallback for
//!   any requested format when the manifest contains no file references;
//! * `file_reference` — absolute path under the backend output
//!   directory, no I/O performed;
//! * `binary` — bytes fetched from the backend's file endpoint,
//!   base64-encoded, MIME inferred from the extension; a failed fetch
//!   degrades that single file to `file_reference` with the error
//!   attached while the remaining files format normally.
//!
//! Exactly one resolved file yields its payload directly; several yield
//! a `multi-result` container with order preserved.

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use relay_db::models::OutputFormat;
use serde::Serialize;

use crate::api::ComfyService;

/// Media category of a referenced output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Video,
    Audio,
}

/// A single typed file reference extracted from the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub filename: String,
    pub kind: FileKind,
}

/// Caller-facing result payload, tagged by `format`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "format")]
pub enum ResultPayload {
    /// The raw manifest as opaque structured data.
    #[serde(rename = "text")]
    Text { data: String },

    /// Absolute path to the file on the backend host. Existence is not
    /// verified. `error` carries the fetch failure when this form is a
    /// degradation of a requested `binary`.
    #[serde(rename = "file_reference")]
    FileReference {
        #[serde(rename = "type")]
        kind: FileKind,
        data: String,
        filename: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// Base64-encoded file contents with an inferred MIME type.
    #[serde(rename = "binary")]
    Binary {
        #[serde(rename = "type")]
        kind: FileKind,
        data: String,
        filename: String,
        mime_type: String,
    },

    /// Container for manifests that resolve to several files.
    #[serde(rename = "multi-result")]
    MultiResult { results: Vec<ResultPayload> },
}

/// Infer a MIME type from the filename extension.
///
/// Unknown extensions map to the generic octet-stream type.
pub fn mime_for_filename(filename: &str) -> String {
    let ext = filename
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg".to_string(),
        "png" | "gif" | "webp" => format!("image/{ext}"),
        "mp4" | "avi" | "mov" | "webm" => format!("video/{ext}"),
        "mp3" | "wav" | "ogg" | "flac" => format!("audio/{ext}"),
        _ => "application/octet-stream".to_string(),
    }
}

/// Extract every typed file reference from a manifest, in manifest
/// order.
pub fn collect_files(manifest: &serde_json::Value) -> Vec<FileRef> {
    let mut files = Vec::new();
    let Some(nodes) = manifest.as_object() else {
        return files;
    };

    for node_output in nodes.values() {
        for (key, kind) in [
            ("images", FileKind::Image),
            ("videos", FileKind::Video),
            ("audio", FileKind::Audio),
        ] {
            let Some(entries) = node_output.get(key).and_then(|v| v.as_array()) else {
                continue;
            };
            for entry in entries {
                if let Some(filename) = entry.get("filename").and_then(|v| v.as_str()) {
                    files.push(FileRef {
                        filename: filename.to_string(),
                        kind,
                    });
                }
            }
        }
    }

    files
}

/// Build the caller-facing payload for a completed job.
pub async fn format_output(
    comfy: &dyn ComfyService,
    requested: OutputFormat,
    manifest: &serde_json::Value,
    output_dir: &Path,
) -> ResultPayload {
    if requested == OutputFormat::Text {
        return text_payload(manifest);
    }

    let files = collect_files(manifest);
    if files.is_empty() {
        // No file references: degrade to the text form regardless of
        // the requested format.
        return text_payload(manifest);
    }

    let mut results = Vec::with_capacity(files.len());
    for file in files {
        let payload = match requested {
            OutputFormat::FileReference => file_reference_payload(&file, output_dir, None),
            OutputFormat::Binary => match comfy.fetch_file(&file.filename).await {
                Ok(bytes) => ResultPayload::Binary {
                    kind: file.kind,
                    data: BASE64.encode(&bytes),
                    mime_type: mime_for_filename(&file.filename),
                    filename: file.filename,
                },
                Err(e) => {
                    tracing::error!(
                        filename = %file.filename,
                        error = %e,
                        "Failed to fetch output file, degrading to file reference",
                    );
                    file_reference_payload(&file, output_dir, Some(e.to_string()))
                }
            },
            OutputFormat::Text => unreachable!("text is handled above"),
        };
        results.push(payload);
    }

    if results.len() == 1 {
        results.remove(0)
    } else {
        ResultPayload::MultiResult { results }
    }
}

fn text_payload(manifest: &serde_json::Value) -> ResultPayload {
    ResultPayload::Text {
        data: manifest.to_string(),
    }
}

fn file_reference_payload(
    file: &FileRef,
    output_dir: &Path,
    error: Option<String>,
) -> ResultPayload {
    ResultPayload::FileReference {
        kind: file.kind,
        data: output_dir.join(&file.filename).to_string_lossy().into_owned(),
        filename: file.filename.clone(),
        error,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::api::{ComfyApiError, SubmitResponse};

    /// Serves canned bytes; fails for configured filenames.
    #[derive(Default)]
    struct StubBackend {
        failing: HashSet<String>,
        fetches: AtomicUsize,
    }

    impl StubBackend {
        fn failing_for(filename: &str) -> Self {
            Self {
                failing: HashSet::from([filename.to_string()]),
                fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ComfyService for StubBackend {
        async fn submit_prompt(
            &self,
            _workflow: &serde_json::Value,
            _client_id: &str,
        ) -> Result<SubmitResponse, ComfyApiError> {
            unimplemented!("not used by the formatter")
        }

        async fn get_history(&self, _prompt_id: &str) -> Result<serde_json::Value, ComfyApiError> {
            unimplemented!("not used by the formatter")
        }

        async fn fetch_file(&self, filename: &str) -> Result<Vec<u8>, ComfyApiError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(filename) {
                return Err(ComfyApiError::ApiError {
                    status: 500,
                    body: "boom".into(),
                });
            }
            Ok(format!("bytes-of-{filename}").into_bytes())
        }
    }

    fn out_dir() -> PathBuf {
        PathBuf::from("/srv/comfy/output")
    }

    #[test]
    fn mime_inference_matches_extension_table() {
        assert_eq!(mime_for_filename("a.png"), "image/png");
        assert_eq!(mime_for_filename("a.jpg"), "image/jpeg");
        assert_eq!(mime_for_filename("a.JPEG"), "image/jpeg");
        assert_eq!(mime_for_filename("a.webp"), "image/webp");
        assert_eq!(mime_for_filename("a.mp4"), "video/mp4");
        assert_eq!(mime_for_filename("a.flac"), "audio/flac");
        assert_eq!(mime_for_filename("a.bin"), "application/octet-stream");
        assert_eq!(mime_for_filename("no-extension"), "application/octet-stream");
    }

    #[test]
    fn collect_files_reads_all_media_kinds_in_order() {
        let manifest = json!({
            "9": {
                "images": [{"filename": "a.png"}, {"filename": "b.png"}],
                "audio": [{"filename": "c.wav"}]
            }
        });

        let files = collect_files(&manifest);
        assert_eq!(
            files,
            vec![
                FileRef { filename: "a.png".into(), kind: FileKind::Image },
                FileRef { filename: "b.png".into(), kind: FileKind::Image },
                FileRef { filename: "c.wav".into(), kind: FileKind::Audio },
            ]
        );
    }

    #[tokio::test]
    async fn empty_manifest_falls_back_to_text_for_every_format() {
        let backend = StubBackend::default();
        let manifest = json!({"9": {"status": "done"}});

        for requested in [
            OutputFormat::Text,
            OutputFormat::FileReference,
            OutputFormat::Binary,
        ] {
            let payload = format_output(&backend, requested, &manifest, &out_dir()).await;
            match payload {
                ResultPayload::Text { data } => {
                    assert_eq!(
                        serde_json::from_str::<serde_json::Value>(&data).unwrap(),
                        manifest
                    );
                }
                other => panic!("Expected Text fallback, got {other:?}"),
            }
        }
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn single_file_binary_payload_with_mime() {
        let backend = StubBackend::default();
        let manifest = json!({"9": {"images": [{"filename": "a.png"}]}});

        let payload =
            format_output(&backend, OutputFormat::Binary, &manifest, &out_dir()).await;

        match payload {
            ResultPayload::Binary {
                kind,
                data,
                filename,
                mime_type,
            } => {
                assert_eq!(kind, FileKind::Image);
                assert_eq!(filename, "a.png");
                assert_eq!(mime_type, "image/png");
                assert_eq!(BASE64.decode(data).unwrap(), b"bytes-of-a.png");
            }
            other => panic!("Expected Binary, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn single_file_reference_resolves_path_without_io() {
        let backend = StubBackend::default();
        let manifest = json!({"9": {"videos": [{"filename": "clip.mp4"}]}});

        let payload =
            format_output(&backend, OutputFormat::FileReference, &manifest, &out_dir()).await;

        match payload {
            ResultPayload::FileReference {
                kind,
                data,
                filename,
                error,
            } => {
                assert_eq!(kind, FileKind::Video);
                assert_eq!(data, "/srv/comfy/output/clip.mp4");
                assert_eq!(filename, "clip.mp4");
                assert!(error.is_none());
            }
            other => panic!("Expected FileReference, got {other:?}"),
        }
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn two_files_produce_multi_result_in_order() {
        let backend = StubBackend::default();
        let manifest = json!({
            "9": {"images": [{"filename": "first.png"}, {"filename": "second.png"}]}
        });

        let payload =
            format_output(&backend, OutputFormat::Binary, &manifest, &out_dir()).await;

        match payload {
            ResultPayload::MultiResult { results } => {
                assert_eq!(results.len(), 2);
                assert!(
                    matches!(&results[0], ResultPayload::Binary { filename, .. } if filename == "first.png")
                );
                assert!(
                    matches!(&results[1], ResultPayload::Binary { filename, .. } if filename == "second.png")
                );
            }
            other => panic!("Expected MultiResult, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_failure_degrades_single_file_only() {
        let backend = StubBackend::failing_for("bad.png");
        let manifest = json!({
            "9": {"images": [{"filename": "good.png"}, {"filename": "bad.png"}]}
        });

        let payload =
            format_output(&backend, OutputFormat::Binary, &manifest, &out_dir()).await;

        let ResultPayload::MultiResult { results } = payload else {
            panic!("Expected MultiResult");
        };

        assert!(
            matches!(&results[0], ResultPayload::Binary { filename, .. } if filename == "good.png")
        );
        match &results[1] {
            ResultPayload::FileReference {
                filename, error, ..
            } => {
                assert_eq!(filename, "bad.png");
                assert!(error.as_deref().unwrap().contains("500"));
            }
            other => panic!("Expected degraded FileReference, got {other:?}"),
        }
    }

    #[test]
    fn multi_result_serializes_with_container_tag() {
        let payload = ResultPayload::MultiResult { results: vec![] };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["format"], "multi-result");
    }
}
