use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::error::{FetchError, MutationError};
use crate::gateway::Gateway;
use crate::model::{Resource, ResourceId, ResourceKind};
use crate::session::SessionContext;

/// How many records a collection may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// At most one record; extra records from the gateway are ignored.
    Single,
    List,
}

/// Identifies one issued refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket(u64);

/// What followed a successful mutation.
#[derive(Debug)]
pub struct MutationReport {
    /// Outcome of the refresh that every successful mutation triggers.
    pub refresh: Result<usize, FetchError>,
}

/// Authoritative in-memory copy of one collection.
///
/// Mutations never patch the local items: each success is followed by a
/// full refresh, so the store always converges on the server's list.
#[derive(Debug)]
pub struct ResourceStore<R> {
    items: Vec<R>,
    cardinality: Cardinality,
    error: Option<String>,
    issued: u64,
    applied: u64,
    refreshes: u64,
}

impl<R: Resource> ResourceStore<R> {
    pub fn new(cardinality: Cardinality) -> Self {
        Self {
            items: Vec::new(),
            cardinality,
            error: None,
            issued: 0,
            applied: 0,
            refreshes: 0,
        }
    }

    pub fn items(&self) -> &[R] {
        &self.items
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn get(&self, id: &ResourceId) -> Option<&R> {
        self.items.iter().find(|item| item.id() == Some(id))
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.get(id).is_some()
    }

    /// True while the newest issued refresh has not completed.
    pub fn is_loading(&self) -> bool {
        self.issued > self.applied
    }

    /// Banner text of the last failed refresh, cleared by the next success.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Forget every record and the error banner. Refreshes still in flight
    /// are dropped when they complete.
    pub fn clear(&mut self) {
        self.items.clear();
        self.error = None;
        self.applied = self.issued;
        info!(kind = R::KIND.as_str(), "collection cleared");
    }

    /// Number of refreshes issued so far.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes
    }

    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.issued += 1;
        self.refreshes += 1;
        RefreshTicket(self.issued)
    }

    /// Apply a fetched list. Completions older than one already applied are
    /// discarded; a failure keeps the previous items visible.
    pub fn complete_refresh(
        &mut self,
        ticket: RefreshTicket,
        result: Result<Vec<Value>, FetchError>,
    ) -> Result<usize, FetchError> {
        if ticket.0 <= self.applied {
            warn!(ticket = ticket.0, applied = self.applied, "discarding stale refresh");
            return Ok(self.items.len());
        }
        self.applied = ticket.0;

        let decoded = result.and_then(|raw| {
            raw.into_iter()
                .map(|v| serde_json::from_value::<R>(v).map_err(|e| FetchError::Decode(e.to_string())))
                .collect::<Result<Vec<R>, _>>()
        });
        match decoded {
            Ok(mut items) => {
                if self.cardinality == Cardinality::Single {
                    items.truncate(1);
                }
                self.items = items;
                self.error = None;
                info!(kind = R::KIND.as_str(), count = self.items.len(), "collection refreshed");
                Ok(self.items.len())
            }
            Err(err) => {
                warn!(kind = R::KIND.as_str(), %err, "refresh failed; keeping previous items");
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Replace the collection with the gateway's current list.
    #[instrument(skip_all, fields(kind = R::KIND.as_str()))]
    pub async fn refresh(
        &mut self,
        gateway: &dyn Gateway,
        session: &SessionContext,
    ) -> Result<usize, FetchError> {
        let ticket = self.begin_refresh();
        let result = fetch(gateway, session, R::KIND).await;
        self.complete_refresh(ticket, result)
    }

    #[instrument(skip_all, fields(kind = R::KIND.as_str()))]
    pub async fn create(
        &mut self,
        record: &R,
        gateway: &dyn Gateway,
        session: &SessionContext,
    ) -> Result<MutationReport, MutationError> {
        if self.cardinality == Cardinality::Single && !self.items.is_empty() {
            return Err(MutationError::SingleRecordExists);
        }
        let body = record
            .to_body()
            .map_err(|e| MutationError::Encode(e.to_string()))?;
        let token = session.token().ok_or(MutationError::NotAuthenticated)?;
        gateway.create(R::KIND, &body, &token).await?;
        info!("record created");
        Ok(self.after_mutation(gateway, session).await)
    }

    #[instrument(skip_all, fields(kind = R::KIND.as_str(), %id))]
    pub async fn update(
        &mut self,
        id: &ResourceId,
        record: &R,
        gateway: &dyn Gateway,
        session: &SessionContext,
    ) -> Result<MutationReport, MutationError> {
        let body = record
            .to_body()
            .map_err(|e| MutationError::Encode(e.to_string()))?;
        let token = session.token().ok_or(MutationError::NotAuthenticated)?;
        gateway.update(R::KIND, id, &body, &token).await?;
        info!("record updated");
        Ok(self.after_mutation(gateway, session).await)
    }

    /// Delete a record that is present in the current collection.
    #[instrument(skip_all, fields(kind = R::KIND.as_str(), %id))]
    pub async fn delete(
        &mut self,
        id: &ResourceId,
        gateway: &dyn Gateway,
        session: &SessionContext,
    ) -> Result<MutationReport, MutationError> {
        if !self.contains(id) {
            return Err(MutationError::UnknownRecord(id.to_string()));
        }
        let token = session.token().ok_or(MutationError::NotAuthenticated)?;
        gateway.delete(R::KIND, id, &token).await?;
        info!("record deleted");
        Ok(self.after_mutation(gateway, session).await)
    }

    async fn after_mutation(
        &mut self,
        gateway: &dyn Gateway,
        session: &SessionContext,
    ) -> MutationReport {
        MutationReport {
            refresh: self.refresh(gateway, session).await,
        }
    }
}

/// Fetch the raw list, reading the token just before the call.
pub async fn fetch(
    gateway: &dyn Gateway,
    session: &SessionContext,
    kind: ResourceKind,
) -> Result<Vec<Value>, FetchError> {
    let token = session.token().ok_or(FetchError::NotAuthenticated)?;
    Ok(gateway.list(kind, &token).await?)
}
