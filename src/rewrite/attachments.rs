use crate::client::{TrackerEndpoints, WebClient};
use crate::error::{ExportError, Result};
use std::fs;
use std::path::Path;
use url::Url;

/// Local destination derived from an attachment's remote URL. Resolution is
/// pure and deterministic, so re-runs land on the same path and overwrite
/// instead of duplicating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentPath {
    /// Path below the output root, always `attachments/...`, lowercased.
    pub relative: String,
    /// Tracker-side attachment id, taken from the URL path.
    pub old_id: String,
    /// File extension including the dot, or empty.
    pub extension: String,
}

/// Resolves the local path for a remote attachment URL. The tracker's own
/// base path is stripped first, then the id is the second-to-last remaining
/// segment, which holds for both root and sub-path deployments.
pub fn resolve_path(
    remote_url: &str,
    endpoints: &TrackerEndpoints,
    project_label: &str,
) -> Result<AttachmentPath> {
    let parsed = Url::parse(remote_url)?;
    let path = endpoints.strip_base_path(parsed.path());

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 2 {
        return Err(ExportError::InvalidUrl {
            url: remote_url.to_string(),
        });
    }

    let file_name = segments[segments.len() - 1];
    let old_id = segments[segments.len() - 2].to_string();

    let extension = file_name
        .rfind('.')
        .filter(|index| *index > 0)
        .map(|index| file_name[index..].to_string())
        .unwrap_or_default();

    let relative = format!("attachments/{}_{}{}", project_label, old_id, extension).to_lowercase();

    Ok(AttachmentPath {
        relative,
        old_id,
        extension,
    })
}

/// Downloads attachment bytes through the authenticated session and writes
/// them below the output root.
pub struct AttachmentFetcher<'a> {
    web: &'a dyn WebClient,
    endpoints: &'a TrackerEndpoints,
    output_root: &'a Path,
    destination_base: String,
}

impl<'a> AttachmentFetcher<'a> {
    pub fn new(
        web: &'a dyn WebClient,
        endpoints: &'a TrackerEndpoints,
        output_root: &'a Path,
        destination_base: &str,
    ) -> Self {
        Self {
            web,
            endpoints,
            output_root,
            destination_base: destination_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn resolve(&self, remote_url: &str, project_label: &str) -> Result<AttachmentPath> {
        resolve_path(remote_url, self.endpoints, project_label)
    }

    /// Fetches one attachment and stores it. Returns the public URL that
    /// replaces the remote one inside the rewritten cell. Existing files
    /// from earlier runs are overwritten.
    pub fn fetch_and_store(&self, remote_url: &str, project_label: &str) -> Result<String> {
        let resolved = self.resolve(remote_url, project_label)?;

        // Re-request through our own session; the export may carry URLs for
        // a differently-deployed host name.
        let parsed = Url::parse(remote_url)?;
        let fetch_url = self
            .endpoints
            .absolute_from_path(self.endpoints.strip_base_path(parsed.path()));

        let bytes = self.web.fetch_binary(&fetch_url)?;

        let destination = self.output_root.join(&resolved.relative);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&destination, &bytes)?;

        Ok(format!("{}/{}", self.destination_base, resolved.relative))
    }
}
