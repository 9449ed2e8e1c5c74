//! Listing and alias handling common to app bundles and activities.

use std::collections::HashSet;

use anyhow::{Context, Result, bail};
use da_api::{ApiResult, ApiResponse, AutomationClient};
use da_types::{AliasPayload, AliasResponse, Page};
use reqwest::StatusCode;
use tracing::{debug, info, warn};

/// The two versioned, aliased resource kinds of the automation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    AppBundle,
    Activity,
}

impl ResourceKind {
    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::AppBundle => "app bundle",
            ResourceKind::Activity => "activity",
        }
    }

    async fn list(self, automation: &AutomationClient, page: Option<&str>) -> ApiResult<ApiResponse> {
        match self {
            ResourceKind::AppBundle => automation.list_app_bundles(page).await,
            ResourceKind::Activity => automation.list_activities(page).await,
        }
    }

    async fn get_alias(self, automation: &AutomationClient, id: &str, alias: &str) -> ApiResult<ApiResponse> {
        match self {
            ResourceKind::AppBundle => automation.get_app_bundle_alias(id, alias).await,
            ResourceKind::Activity => automation.get_activity_alias(id, alias).await,
        }
    }

    async fn create_alias(self, automation: &AutomationClient, id: &str, payload: &AliasPayload) -> ApiResult<ApiResponse> {
        match self {
            ResourceKind::AppBundle => automation.create_app_bundle_alias(id, payload).await,
            ResourceKind::Activity => automation.create_activity_alias(id, payload).await,
        }
    }

    async fn update_alias(
        self,
        automation: &AutomationClient,
        id: &str,
        alias: &str,
        payload: &AliasPayload,
    ) -> ApiResult<ApiResponse> {
        match self {
            ResourceKind::AppBundle => automation.update_app_bundle_alias(id, alias, payload).await,
            ResourceKind::Activity => automation.update_activity_alias(id, alias, payload).await,
        }
    }
}

/// Walks every page of the listing looking for an exact `qualified_name` match.
///
/// Stops at the first pagination token the service repeats.
pub async fn resource_exists(automation: &AutomationClient, kind: ResourceKind, qualified_name: &str) -> Result<bool> {
    let mut page: Option<String> = None;
    let mut seen = HashSet::new();
    loop {
        let response = kind
            .list(automation, page.as_deref())
            .await
            .with_context(|| format!("list {}s", kind.label()))?
            .ensure_success(&format!("listing {}s failed", kind.label()))?;
        let listing: Page<String> = response
            .json()
            .with_context(|| format!("decode {} listing", kind.label()))?;
        if listing.data.iter().any(|name| name == qualified_name) {
            debug!(kind = kind.label(), name = %qualified_name, "found in listing");
            return Ok(true);
        }
        match listing.next_page() {
            Some(token) if seen.insert(token.to_string()) => page = Some(token.to_string()),
            Some(token) => {
                warn!(kind = kind.label(), token, "listing repeated a pagination token");
                return Ok(false);
            }
            None => return Ok(false),
        }
    }
}

/// Points `alias` at `version`, creating the alias on first use.
pub async fn ensure_alias(automation: &AutomationClient, kind: ResourceKind, id: &str, alias: &str, version: u64) -> Result<()> {
    let existing = kind
        .get_alias(automation, id, alias)
        .await
        .with_context(|| format!("look up alias {alias} of {} {id}", kind.label()))?;

    if existing.status() == StatusCode::NOT_FOUND {
        info!(kind = kind.label(), id, alias, version, "creating alias");
        kind.create_alias(automation, id, &AliasPayload::create(alias, version))
            .await
            .with_context(|| format!("create alias {alias} of {} {id}", kind.label()))?
            .ensure_success(&format!("creating {} alias failed", kind.label()))?;
        return Ok(());
    }
    if !existing.is_success() {
        existing.report_error(&format!("getting {} alias failed", kind.label()));
        bail!("alias {alias} of {} {id} could not be read (status {})", kind.label(), existing.status());
    }

    let previous = existing.json::<AliasResponse>().ok().map(|current| current.version);
    info!(kind = kind.label(), id, alias, version, previous = ?previous, "updating alias");
    kind.update_alias(automation, id, alias, &AliasPayload::update(version))
        .await
        .with_context(|| format!("update alias {alias} of {} {id}", kind.label()))?
        .ensure_success(&format!("updating {} alias failed", kind.label()))?;
    Ok(())
}
