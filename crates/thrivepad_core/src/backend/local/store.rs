//! Document storage, access rules and snapshot fan-out for the local backend.
//!
//! # Invariants
//! - A document is owned by the identity in its `ownerId` field; only the
//!   owner may read, write or delete it. Updates of a foreign document fail
//!   as `NotFound`, other foreign writes as `PermissionDenied`.
//! - Server-timestamp sentinels are resolved with the backend clock before
//!   anything is persisted.
//! - Every committed write pushes a fresh snapshot to each listener of the
//!   written collection.

use super::{Inner, LocalBackend, OFFLINE_MESSAGE};
use crate::backend::{
    Document, DocumentId, DocumentStore, FieldValue, Fields, IdentityId, Listener,
    ListenerRegistration, Query, SnapshotResult, Timestamp, OWNER_FIELD,
};
use crate::error::StoreError;
use async_trait::async_trait;
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
impl DocumentStore for LocalBackend {
    async fn subscribe(
        &self,
        collection: &str,
        query: Query,
        listener: Listener<SnapshotResult>,
    ) -> Result<ListenerRegistration, StoreError> {
        let inner = &self.inner;
        let caller = inner.require_caller()?;
        if query.owner_scope() != Some(caller.as_str()) {
            return Err(StoreError::PermissionDenied(format!(
                "queries on `{collection}` must filter `{OWNER_FIELD}` to the signed-in identity"
            )));
        }

        // Writes need the connection, so none can commit between the initial
        // snapshot and registration.
        let id = {
            let conn = inner.lock_conn()?;
            let initial = apply_query(load_collection(&conn, collection)?, &query);
            listener(Ok(initial));
            inner
                .query_listeners
                .register((collection.to_string(), query), listener)
        };
        debug!("event=subscribe module=local_backend status=ok collection={collection} listener={id}");

        let weak = Arc::downgrade(inner);
        Ok(ListenerRegistration::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.query_listeners.remove(id);
            }
        }))
    }

    async fn insert(&self, collection: &str, fields: Fields) -> Result<DocumentId, StoreError> {
        let inner = &self.inner;
        let caller = inner.require_caller()?;
        let fields = inner.resolve_server_timestamps(fields);
        ensure_owned_by(&caller, &fields)?;

        let document = Document::new(Uuid::new_v4().simple().to_string(), fields);
        {
            let conn = inner.lock_conn()?;
            write_document(&conn, collection, &document, &caller, inner.now_millis())?;
        }
        info!(
            "event=insert module=local_backend status=ok collection={collection} id={}",
            document.id
        );
        inner.notify(collection);
        Ok(document.id)
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        let inner = &self.inner;
        let caller = inner.require_caller()?;
        let fields = inner.resolve_server_timestamps(fields);
        ensure_owned_by(&caller, &fields)?;

        {
            let conn = inner.lock_conn()?;
            if let Some(existing) = load_document(&conn, collection, id)? {
                ensure_owned_by(&caller, &existing.fields)?;
            }
            let document = Document::new(id, fields);
            write_document(&conn, collection, &document, &caller, inner.now_millis())?;
        }
        info!("event=set module=local_backend status=ok collection={collection} id={id}");
        inner.notify(collection);
        Ok(())
    }

    async fn merge_update(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), StoreError> {
        let inner = &self.inner;
        let caller = inner.require_caller()?;
        let patch = inner.resolve_server_timestamps(fields);

        {
            let conn = inner.lock_conn()?;
            // Foreign documents are reported as missing.
            let Some(mut document) = load_document(&conn, collection, id)?
                .filter(|existing| ensure_owned_by(&caller, &existing.fields).is_ok())
            else {
                return Err(StoreError::NotFound(id.to_string()));
            };
            document.fields.extend(patch);
            ensure_owned_by(&caller, &document.fields)?;
            write_document(&conn, collection, &document, &caller, inner.now_millis())?;
        }
        info!("event=merge_update module=local_backend status=ok collection={collection} id={id}");
        inner.notify(collection);
        Ok(())
    }

    async fn remove(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let inner = &self.inner;
        let caller = inner.require_caller()?;

        {
            let conn = inner.lock_conn()?;
            let Some(existing) = load_document(&conn, collection, id)? else {
                debug!("event=remove module=local_backend status=noop collection={collection} id={id}");
                return Ok(());
            };
            ensure_owned_by(&caller, &existing.fields)?;
            conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2;",
                params![collection, id],
            )
            .map_err(unavailable)?;
        }
        info!("event=remove module=local_backend status=ok collection={collection} id={id}");
        inner.notify(collection);
        Ok(())
    }
}

impl Inner {
    fn require_caller(&self) -> Result<IdentityId, StoreError> {
        if self.is_offline() {
            return Err(StoreError::Unavailable(OFFLINE_MESSAGE.to_string()));
        }
        self.current_identity()
            .map(|identity| identity.id)
            .ok_or_else(|| StoreError::PermissionDenied("no signed-in identity".to_string()))
    }

    fn now_millis(&self) -> i64 {
        self.clock.utc().timestamp_millis()
    }

    fn resolve_server_timestamps(&self, fields: Fields) -> Fields {
        let now = Timestamp::from_date_time(self.clock.utc());
        fields
            .into_iter()
            .map(|(key, value)| (key, resolve_value(value, now)))
            .collect()
    }

    /// Pushes a fresh snapshot to every listener of `collection`.
    fn notify(&self, collection: &str) {
        let listeners = self.query_listeners.matching(|(name, _)| name == collection);
        if listeners.is_empty() {
            return;
        }

        let documents = self
            .lock_conn()
            .and_then(|conn| load_collection(&conn, collection));
        for ((_, query), listener) in listeners {
            let snapshot = documents
                .clone()
                .map(|documents| apply_query(documents, &query));
            listener(snapshot);
        }
    }
}

fn resolve_value(value: FieldValue, now: Timestamp) -> FieldValue {
    match value {
        FieldValue::ServerTimestamp => FieldValue::Timestamp(now),
        FieldValue::Array(items) => FieldValue::Array(
            items
                .into_iter()
                .map(|item| resolve_value(item, now))
                .collect(),
        ),
        other => other,
    }
}

fn apply_query(documents: Vec<Document>, query: &Query) -> Vec<Document> {
    let mut matching: Vec<Document> = documents
        .into_iter()
        .filter(|document| query.matches(&document.fields))
        .collect();
    query.sort(&mut matching);
    matching
}

fn ensure_owned_by(caller: &IdentityId, fields: &Fields) -> Result<(), StoreError> {
    match fields.get(OWNER_FIELD).and_then(FieldValue::as_str) {
        Some(owner) if owner == caller.as_str() => Ok(()),
        Some(_) => Err(StoreError::PermissionDenied(
            "document belongs to another identity".to_string(),
        )),
        None => Err(StoreError::PermissionDenied(format!(
            "document has no `{OWNER_FIELD}`"
        ))),
    }
}

fn load_document(
    conn: &Connection,
    collection: &str,
    id: &str,
) -> Result<Option<Document>, StoreError> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT fields FROM documents WHERE collection = ?1 AND id = ?2;",
            params![collection, id],
            |row| row.get(0),
        )
        .optional()
        .map_err(unavailable)?;
    raw.map(|raw| parse_fields(id, &raw).map(|fields| Document::new(id, fields)))
        .transpose()
}

fn load_collection(conn: &Connection, collection: &str) -> Result<Vec<Document>, StoreError> {
    let mut stmt = conn
        .prepare("SELECT id, fields FROM documents WHERE collection = ?1;")
        .map_err(unavailable)?;
    let mut rows = stmt.query([collection]).map_err(unavailable)?;
    let mut documents = Vec::new();
    while let Some(row) = rows.next().map_err(unavailable)? {
        let id: String = row.get(0).map_err(unavailable)?;
        let raw: String = row.get(1).map_err(unavailable)?;
        let fields = parse_fields(&id, &raw)?;
        documents.push(Document::new(id, fields));
    }
    Ok(documents)
}

fn write_document(
    conn: &Connection,
    collection: &str,
    document: &Document,
    owner: &IdentityId,
    now_millis: i64,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(&document.fields)
        .map_err(|err| StoreError::InvalidArgument(err.to_string()))?;
    conn.execute(
        "INSERT INTO documents (collection, id, owner_id, fields, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (collection, id) DO UPDATE SET
            owner_id = excluded.owner_id,
            fields = excluded.fields,
            updated_at = excluded.updated_at;",
        params![
            collection,
            document.id.as_str(),
            owner.as_str(),
            raw,
            now_millis
        ],
    )
    .map_err(unavailable)?;
    Ok(())
}

fn parse_fields(id: &str, raw: &str) -> Result<Fields, StoreError> {
    serde_json::from_str(raw).map_err(|err| {
        StoreError::Unavailable(format!("stored document `{id}` is corrupt: {err}"))
    })
}

fn unavailable(err: rusqlite::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}
