//! Page loading over HTTP.
//!
//! The loader fetches one URL into an [`HtmlPage`] and never retries on its
//! own: retry policy belongs to the orchestrator. Contact sub-page probing is
//! a single pass over a fixed candidate list.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument, warn};
use url::Url;

use vanbuilder_shared::{Result, VanBuilderError};

use crate::page::HtmlPage;

/// User-Agent string for page requests.
const USER_AGENT: &str = concat!("vanbuilder/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects to follow per page.
const MAX_REDIRECTS: usize = 5;

/// Contact sub-page candidates, tried in this order.
pub const CONTACT_PATHS: [&str; 4] = ["/contact", "/contact/", "/contact-us", "/contact-us/"];

// ---------------------------------------------------------------------------
// PageLoader
// ---------------------------------------------------------------------------

/// Loads a URL into a queryable page.
///
/// Futures are not required to be `Send`: targets are processed one at a time
/// and parsed documents stay on the driving task.
#[async_trait(?Send)]
pub trait PageLoader {
    /// Fetch `url` and wait until the content is settled. Any failure is a
    /// [`VanBuilderError::Navigation`].
    async fn load(&self, url: &Url, timeout: Duration) -> Result<HtmlPage>;
}

/// HTTP page loader backed by `reqwest`.
pub struct HttpPageLoader {
    client: Client,
    /// Quiet period after the body is read, before the page is handed out.
    settle: Duration,
    /// Allow localhost/private IPs (for integration tests with mock servers).
    allow_private_hosts: bool,
}

impl HttpPageLoader {
    /// Create a loader that waits `settle` after each body read.
    pub fn new(settle: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| VanBuilderError::navigation(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            settle,
            allow_private_hosts: false,
        })
    }

    /// Allow loading from localhost/private IPs.
    pub fn allow_private_hosts(mut self) -> Self {
        self.allow_private_hosts = true;
        self
    }
}

#[async_trait(?Send)]
impl PageLoader for HttpPageLoader {
    #[instrument(skip_all, fields(url = %url))]
    async fn load(&self, url: &Url, timeout: Duration) -> Result<HtmlPage> {
        if !self.allow_private_hosts && is_ssrf_target(url) {
            warn!(%url, "SSRF protection: blocked");
            return Err(VanBuilderError::navigation(format!(
                "{url}: blocked private or non-HTTP target"
            )));
        }

        debug!(timeout_ms = timeout.as_millis(), "loading page");

        let response = self
            .client
            .get(url.as_str())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| VanBuilderError::navigation(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VanBuilderError::navigation(format!("{url}: HTTP {status}")));
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| VanBuilderError::navigation(format!("{url}: body read failed: {e}")))?;

        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }

        debug!(bytes = body.len(), final_url = %final_url, "page loaded");
        Ok(HtmlPage::parse(final_url, &body))
    }
}

// ---------------------------------------------------------------------------
// Contact sub-page probing
// ---------------------------------------------------------------------------

/// Try each contact candidate in order and return the first page that loads
/// and that `accept` approves (typically: at least one contact field found).
///
/// Returns `None` when every candidate fails; the caller continues with
/// main-page data only.
pub async fn find_contact_page<L, F>(
    loader: &L,
    base: &Url,
    timeout: Duration,
    accept: F,
) -> Option<HtmlPage>
where
    L: PageLoader + ?Sized,
    F: Fn(&HtmlPage) -> bool,
{
    for path in CONTACT_PATHS {
        let Ok(candidate) = base.join(path) else {
            continue;
        };
        match loader.load(&candidate, timeout).await {
            Ok(page) if accept(&page) => {
                debug!(url = %candidate, "contact page accepted");
                return Some(page);
            }
            Ok(_) => debug!(url = %candidate, "contact page had no contact fields"),
            Err(e) => debug!(url = %candidate, error = %e, "contact candidate failed"),
        }
    }
    None
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets a potentially dangerous resource.
pub fn is_ssrf_target(url: &Url) -> bool {
    // Block non-HTTP schemes
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}
