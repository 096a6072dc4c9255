use crate::error::Result;
use url::form_urlencoded;
use url::Url;

/// URL templates for the tracker's HTML/CSV export surface. All URLs are
/// built from the normalized base URL by concatenation, so a tracker served
/// from a sub-path (e.g. https://example.com/jira) keeps its prefix.
#[derive(Debug, Clone)]
pub struct TrackerEndpoints {
    base: String,
    base_path: String,
}

impl TrackerEndpoints {
    pub fn new(base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url)?;
        let base = base_url.trim_end_matches('/').to_string();
        let base_path = parsed.path().trim_end_matches('/').to_string();

        Ok(Self { base, base_path })
    }

    /// Base URL without a trailing slash.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Path component under which the tracker is served; empty for a
    /// server-root deployment.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn navigator(&self, jql: &str) -> String {
        format!("{}/issues/?jql={}", self.base, encode(jql))
    }

    pub fn navigator_at(&self, jql: &str, start_index: usize) -> String {
        format!("{}&startIndex={}", self.navigator(jql), start_index)
    }

    pub fn search_layout(&self) -> String {
        format!("{}/rest/issueNav/latest/preferredSearchLayout", self.base)
    }

    /// CSV export of all fields, with the delimiter pinned to a comma so the
    /// rewriter never has to guess.
    pub fn csv_export(&self, jql: &str) -> String {
        format!(
            "{}/sr/jira.issueviews:searchrequest-csv-all-fields/temp/SearchRequest.csv?delimiter=,&jqlQuery={}",
            self.base,
            encode(jql)
        )
    }

    pub fn login_form(&self) -> String {
        format!("{}/login.jsp", self.base)
    }

    pub fn user_api(&self, username: &str) -> String {
        format!("{}/rest/api/2/user?username={}", self.base, encode(username))
    }

    pub fn profile_page(&self) -> String {
        format!("{}/secure/ViewProfile.jspa", self.base)
    }

    /// Turns a server-relative path (leading slash, base path already
    /// stripped) back into an absolute URL on this tracker.
    pub fn absolute_from_path(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Removes the tracker's own base path from a URL path, if present.
    pub fn strip_base_path<'a>(&self, path: &'a str) -> &'a str {
        if self.base_path.is_empty() {
            return path;
        }

        match path.strip_prefix(self.base_path.as_str()) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
            _ => path,
        }
    }
}

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalization() {
        let endpoints = TrackerEndpoints::new("https://example.com/jira/").unwrap();
        assert_eq!(endpoints.base(), "https://example.com/jira");
        assert_eq!(endpoints.base_path(), "/jira");

        let endpoints = TrackerEndpoints::new("https://jira.example.com").unwrap();
        assert_eq!(endpoints.base(), "https://jira.example.com");
        assert_eq!(endpoints.base_path(), "");
    }

    #[test]
    fn test_navigator_url_encodes_query() {
        let endpoints = TrackerEndpoints::new("https://jira.example.com").unwrap();
        let url = endpoints.navigator("project = DEMO ORDER BY key");

        assert!(url.starts_with("https://jira.example.com/issues/?jql="));
        assert!(!url.contains(' '));

        let paged = endpoints.navigator_at("project = DEMO ORDER BY key", 450);
        assert!(paged.ends_with("&startIndex=450"));
    }

    #[test]
    fn test_csv_export_url_pins_delimiter() {
        let endpoints = TrackerEndpoints::new("https://example.com/jira").unwrap();
        let url = endpoints.csv_export("project = DEMO ORDER BY key");

        assert!(url.contains("searchrequest-csv-all-fields"));
        assert!(url.contains("delimiter=,"));
        assert!(url.starts_with("https://example.com/jira/sr/"));
    }

    #[test]
    fn test_strip_base_path() {
        let endpoints = TrackerEndpoints::new("https://example.com/jira").unwrap();

        assert_eq!(
            endpoints.strip_base_path("/jira/secure/attachment/123/report.pdf"),
            "/secure/attachment/123/report.pdf"
        );
        // Foreign prefixes stay untouched, including lookalike path segments.
        assert_eq!(endpoints.strip_base_path("/other/file.pdf"), "/other/file.pdf");
        assert_eq!(
            endpoints.strip_base_path("/jirafoo/file.pdf"),
            "/jirafoo/file.pdf"
        );

        let rootless = TrackerEndpoints::new("https://jira.example.com").unwrap();
        assert_eq!(
            rootless.strip_base_path("/secure/attachment/123/report.pdf"),
            "/secure/attachment/123/report.pdf"
        );
    }
}
