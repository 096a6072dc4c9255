use crate::client::{TrackerEndpoints, WebClient};
use crate::error::{ExportError, Result};
use crate::partition::query::{strip_lower_bound, Query};
use crate::ui::prompt::Confirmation;
use crate::ui::OutputFormatter;
use once_cell::sync::Lazy;
use regex::Regex;

/// Layout the preference endpoint must report; only the list rendering
/// carries the result-count marker this module scrapes.
const LIST_VIEW: &str = "list-view";

/// One sub-query of the original filter, guaranteed at production time to
/// return fewer results than the configured ceiling. Sequence numbers are
/// 1-based and follow ascending issue-key order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub sequence: usize,
    pub jql: String,
}

static RESULT_COUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"class="[^"]*results-count-total[^"]*"[^>]*>\s*([0-9][0-9,.\s]*)<"#)
        .expect("static pattern")
});

static ISSUE_ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"class="[^"]*\bissuerow\b[^"]*""#).expect("static pattern"));

static ISSUE_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)class="[^"]*\bissuekey\b[^"]*"[^>]*>(.*?)</td>"#).expect("static pattern")
});

static MARKUP_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("static pattern"));

/// Reads the total result count from navigator markup. A missing or
/// non-numeric marker means an empty result set, not an error.
pub(crate) fn scrape_result_count(html: &str) -> usize {
    RESULT_COUNT
        .captures(html)
        .and_then(|caps| {
            let digits: String = caps[1].chars().filter(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        })
        .unwrap_or(0)
}

/// Number of result rows rendered on one navigator page.
pub(crate) fn scrape_page_length(html: &str) -> usize {
    ISSUE_ROW.find_iter(html).count()
}

/// Text of the last issue-key cell on the page, with nested markup removed.
pub(crate) fn scrape_last_issue_key(html: &str) -> Option<String> {
    ISSUE_KEY
        .captures_iter(html)
        .last()
        .map(|caps| MARKUP_TAG.replace_all(&caps[1], "").trim().to_string())
        .filter(|key| !key.is_empty())
}

/// Splits one ordered query into boundary-safe sub-queries that each stay
/// below the server's result-size ceiling.
pub struct QueryPartitioner<'a> {
    web: &'a dyn WebClient,
    endpoints: &'a TrackerEndpoints,
    confirmation: &'a dyn Confirmation,
    formatter: &'a OutputFormatter,
    max_issues: usize,
}

impl<'a> QueryPartitioner<'a> {
    pub fn new(
        web: &'a dyn WebClient,
        endpoints: &'a TrackerEndpoints,
        confirmation: &'a dyn Confirmation,
        formatter: &'a OutputFormatter,
        max_issues: usize,
    ) -> Self {
        Self {
            web,
            endpoints,
            confirmation,
            formatter,
            max_issues,
        }
    }

    /// Produces the partition sequence for `query`. Each pass starts from a
    /// fresh accumulator; nothing is shared between invocations.
    pub fn partition(&self, query: &Query) -> Result<Vec<Partition>> {
        self.ensure_list_layout()?;

        let mut expressions = Vec::new();
        let mut tail = query.as_str().to_string();

        loop {
            let page = self.web.fetch_html(&self.endpoints.navigator(&tail))?;
            let count = scrape_result_count(&page);

            if count == 0 {
                break;
            }

            if count < self.max_issues {
                expressions.push(tail);
                break;
            }

            let boundary = self.boundary_key(&tail, scrape_page_length(&page))?;
            let remainder = strip_lower_bound(&tail);

            self.formatter.debug(&format!(
                "{} results for '{}', splitting at {}",
                count, tail, boundary
            ));

            // The emitted part keeps its own lower bound (if any) so the
            // windows stay disjoint; only the continuation query gets the
            // old bound stripped before the new one is prepended.
            expressions.push(format!("key <= {} AND {}", boundary, tail));
            tail = format!("key > {} AND {}", boundary, remainder);
        }

        Ok(expressions
            .into_iter()
            .enumerate()
            .map(|(index, jql)| Partition {
                sequence: index + 1,
                jql,
            })
            .collect())
    }

    /// Fetches the navigator page positioned so that its last rendered row
    /// is the highest key still inside the allowed window, and reads that
    /// key as the split boundary.
    fn boundary_key(&self, jql: &str, page_length: usize) -> Result<String> {
        let start_index = self.max_issues.saturating_sub(page_length);
        let url = self.endpoints.navigator_at(jql, start_index);
        let page = self.web.fetch_html(&url)?;

        scrape_last_issue_key(&page).ok_or_else(|| ExportError::Markup {
            url,
            message: "no issue key markers found on the boundary page".to_string(),
        })
    }

    /// The rendering mode is an account preference with no write API, so
    /// after a failed probe the operator has to flip it in the browser and
    /// confirm before the next probe.
    fn ensure_list_layout(&self) -> Result<()> {
        loop {
            let body = self.web.fetch_html(&self.endpoints.search_layout())?;

            if body.trim() == LIST_VIEW {
                return Ok(());
            }

            self.formatter.warning(
                "Currently, filter results are not displayed as a list but in detail. Please change.",
            );
            self.formatter.warning(
                "To do that, head to this URL with the defined user and change on the top right side:",
            );
            self.formatter.warning(&self.endpoints.navigator(""));

            if !self.confirmation.confirm("Continue?")? {
                return Err(ExportError::Cancelled);
            }
        }
    }
}
