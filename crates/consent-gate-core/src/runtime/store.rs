// crates/consent-gate-core/src/runtime/store.rs
// ============================================================================
// Module: Consent Gate In-Memory Store
// Description: Mutex-guarded dialog store and shared store wrapper.
// Purpose: Provide a deterministic backend for tests and the `memory` store type.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemoryDialogStore`] keeps all three collections behind one mutex, so
//! each trait call is a single critical section and the consent transition is
//! trivially atomic. State is lost on drop; durable deployments use the
//! `SQLite` store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::AnomalyRecord;
use crate::core::ConsentDecision;
use crate::core::ConsentOutcome;
use crate::core::ConsentRequest;
use crate::core::DataFilter;
use crate::core::DialogId;
use crate::core::NewPendingRecord;
use crate::core::PendingRecord;
use crate::core::PermanentRecord;
use crate::core::RecordId;
use crate::core::UtcTimestamp;
use crate::core::newest_first;
use crate::interfaces::DialogStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Collections guarded together.
#[derive(Debug, Default)]
struct MemoryState {
    /// Staging rows keyed by id.
    pending: BTreeMap<i64, PendingRecord>,
    /// Permanent rows keyed by id.
    permanent: BTreeMap<i64, PermanentRecord>,
    /// Consent decisions keyed by dialog.
    consents: BTreeMap<DialogId, ConsentDecision>,
    /// Last staging id handed out.
    pending_seq: i64,
    /// Last permanent id handed out.
    permanent_seq: i64,
    /// Last consent id handed out.
    consent_seq: i64,
}

/// In-memory dialog store for tests and single-process deployments.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDialogStore {
    /// Store state protected by a mutex.
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryDialogStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the store state.
    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Store("dialog store mutex poisoned".to_string()))
    }
}

impl DialogStore for InMemoryDialogStore {
    fn insert_pending(&self, record: NewPendingRecord) -> Result<PendingRecord, StoreError> {
        let mut guard = self.lock()?;
        if guard.consents.contains_key(&record.dialog_id) {
            return Err(StoreError::Conflict(record.dialog_id));
        }
        guard.pending_seq += 1;
        let stored = PendingRecord {
            id: RecordId::from_raw(guard.pending_seq),
            customer_id: record.customer_id,
            dialog_id: record.dialog_id,
            text: record.text,
            language: record.language,
            received_at: record.received_at,
        };
        guard.pending.insert(stored.id.get(), stored.clone());
        drop(guard);
        Ok(stored)
    }

    fn record_consent(&self, request: ConsentRequest) -> Result<ConsentOutcome, StoreError> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        if state.consents.contains_key(&request.dialog_id) {
            return Err(StoreError::Conflict(request.dialog_id));
        }
        let staged: Vec<i64> = state
            .pending
            .values()
            .filter(|row| row.dialog_id == request.dialog_id)
            .map(|row| row.id.get())
            .collect();
        if staged.is_empty() {
            return Err(StoreError::NotFound(request.dialog_id));
        }

        state.consent_seq += 1;
        let decision = ConsentDecision {
            id: RecordId::from_raw(state.consent_seq),
            dialog_id: request.dialog_id.clone(),
            has_given_consent: request.has_given_consent,
            received_at: request.received_at,
        };
        state.consents.insert(request.dialog_id, decision.clone());

        let mut promoted = 0;
        for id in &staged {
            let Some(row) = state.pending.remove(id) else {
                continue;
            };
            if request.has_given_consent {
                state.permanent_seq += 1;
                let kept = PermanentRecord {
                    id: RecordId::from_raw(state.permanent_seq),
                    customer_id: row.customer_id,
                    dialog_id: row.dialog_id,
                    text: row.text,
                    language: row.language,
                    received_at: row.received_at,
                };
                state.permanent.insert(kept.id.get(), kept);
                promoted += 1;
            }
        }
        drop(guard);
        Ok(ConsentOutcome {
            decision,
            promoted,
            cleared: staged.len(),
        })
    }

    fn list_permanent(&self, filter: &DataFilter) -> Result<Vec<PermanentRecord>, StoreError> {
        let mut rows: Vec<PermanentRecord> = {
            let guard = self.lock()?;
            guard.permanent.values().filter(|row| filter.matches(row)).cloned().collect()
        };
        rows.sort_by(newest_first);
        Ok(filter.paginate(rows))
    }

    fn list_anomalies(&self, cutoff: UtcTimestamp) -> Result<Vec<AnomalyRecord>, StoreError> {
        let guard = self.lock()?;
        let mut rows: Vec<(UtcTimestamp, RecordId, AnomalyRecord)> = guard
            .pending
            .values()
            .filter(|row| row.received_at < cutoff && !guard.consents.contains_key(&row.dialog_id))
            .map(|row| {
                (
                    row.received_at,
                    row.id,
                    AnomalyRecord {
                        dialog_id: row.dialog_id.clone(),
                        customer_id: row.customer_id.clone(),
                        received_at: row.received_at,
                    },
                )
            })
            .collect();
        drop(guard);
        rows.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        Ok(rows.into_iter().map(|(_, _, record)| record).collect())
    }

    fn pending_for(&self, dialog_id: &DialogId) -> Result<Vec<PendingRecord>, StoreError> {
        let guard = self.lock()?;
        Ok(guard.pending.values().filter(|row| row.dialog_id == *dialog_id).cloned().collect())
    }

    fn consent_for(&self, dialog_id: &DialogId) -> Result<Option<ConsentDecision>, StoreError> {
        let guard = self.lock()?;
        Ok(guard.consents.get(dialog_id).cloned())
    }

    fn readiness(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }
}

// ============================================================================
// SECTION: Shared Store Wrapper
// ============================================================================

/// Shared dialog store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedDialogStore {
    /// Inner store implementation.
    inner: Arc<dyn DialogStore + Send + Sync>,
}

impl SharedDialogStore {
    /// Wraps a dialog store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl DialogStore + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn DialogStore + Send + Sync>) -> Self {
        Self {
            inner: store,
        }
    }
}

impl DialogStore for SharedDialogStore {
    fn insert_pending(&self, record: NewPendingRecord) -> Result<PendingRecord, StoreError> {
        self.inner.insert_pending(record)
    }

    fn record_consent(&self, request: ConsentRequest) -> Result<ConsentOutcome, StoreError> {
        self.inner.record_consent(request)
    }

    fn list_permanent(&self, filter: &DataFilter) -> Result<Vec<PermanentRecord>, StoreError> {
        self.inner.list_permanent(filter)
    }

    fn list_anomalies(&self, cutoff: UtcTimestamp) -> Result<Vec<AnomalyRecord>, StoreError> {
        self.inner.list_anomalies(cutoff)
    }

    fn pending_for(&self, dialog_id: &DialogId) -> Result<Vec<PendingRecord>, StoreError> {
        self.inner.pending_for(dialog_id)
    }

    fn consent_for(&self, dialog_id: &DialogId) -> Result<Option<ConsentDecision>, StoreError> {
        self.inner.consent_for(dialog_id)
    }

    fn readiness(&self) -> Result<(), StoreError> {
        self.inner.readiness()
    }
}
