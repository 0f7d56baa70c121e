//! Cross-server replication
//!
//! Finds or creates the counterpart of a source resource on a target
//! tenant by business identifier, then upserts it. Re-replicating the same
//! source updates the same target record instead of creating duplicates,
//! as long as the business identifier stays stable and unique per target
//! tenant.

use fhirbridge_domain::{ResourceRecord, Result};
use tracing::debug;

use crate::requester::TenantRequester;

/// Replicate `source` onto `target`, correlating by the business
/// identifier under `identifier_url`.
///
/// Without an identifier URL (or when the source carries no matching
/// identifier) the lookup is skipped and the resource is treated as new.
pub async fn replicate(
    source: &ResourceRecord,
    target: &TenantRequester,
    identifier_url: Option<&str>,
) -> Result<ResourceRecord> {
    let proxy = target.resource(source.resource_type());

    let existing_id = match identifier_url.and_then(|url| source.identifier_value(url)) {
        Some(identifier_value) => proxy
            .search()
            .filter("identifier", identifier_value)
            .first()
            .await?
            .and_then(|record| record.id().map(str::to_string)),
        None => None,
    };

    // Records hold plain data only, so serializing the source carries no
    // session or registry state across servers.
    let mut outgoing = source.clone();
    match &existing_id {
        Some(id) => outgoing.set_id(id.clone()),
        None => outgoing.clear_id(),
    }

    debug!(
        resource_type = %source.resource_type(),
        target = %target.session().base_url(),
        update = existing_id.is_some(),
        "replicating resource"
    );
    proxy.save(outgoing).await
}
