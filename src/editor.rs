use std::marker::PhantomData;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::client::{ApiClient, ApiError};
use crate::records::{Draft, Record, RecordId};
use crate::store::RefreshHook;

/// Transient user-facing notifications (the toast of a UI).
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

#[derive(Clone, Debug, PartialEq)]
pub enum Mutation<D> {
    Create(D),
    Update(RecordId, D),
    Delete(RecordId),
}

impl<D> Mutation<D> {
    fn verbs(&self) -> (&'static str, &'static str) {
        match self {
            Self::Create(_) => ("added", "adding"),
            Self::Update(..) => ("updated", "updating"),
            Self::Delete(_) => ("deleted", "deleting"),
        }
    }
}

/// Create/update/delete against one record kind. A successful call notifies,
/// then fires the refresh hook; the collection itself is never patched
/// locally.
pub struct RecordEditor<R: Record> {
    client: ApiClient,
    notifier: Arc<dyn Notifier>,
    refresh: RefreshHook,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> RecordEditor<R> {
    pub fn new(client: ApiClient, notifier: Arc<dyn Notifier>, refresh: RefreshHook) -> Self {
        Self {
            client,
            notifier,
            refresh,
            _record: PhantomData,
        }
    }

    /// Reads one record the way the edit form does before it opens.
    pub async fn load(&self, id: RecordId) -> Result<R, ApiError> {
        let record: R = self.client.get(&R::KIND.item_path(id)).await?;
        record.validate()?;
        Ok(record)
    }

    /// Update payload built from the stored record with `changes` laid over
    /// it, so fields the caller leaves out keep their current values.
    pub async fn prefill(
        &self,
        id: RecordId,
        changes: serde_json::Map<String, serde_json::Value>,
    ) -> Result<R::Draft, ApiError> {
        let current = self.load(id).await?;
        let mut values = current
            .form_values()
            .map_err(|e| ApiError::Encode { source: e })?;
        if let Some(fields) = values.as_object_mut() {
            fields.extend(changes);
        }
        serde_json::from_value(values).map_err(|e| ApiError::Decode {
            path: R::KIND.item_path(id),
            source: e,
        })
    }

    pub async fn create(&self, draft: R::Draft) -> Result<(), ApiError> {
        self.apply(Mutation::Create(draft)).await
    }

    pub async fn update(&self, id: RecordId, draft: R::Draft) -> Result<(), ApiError> {
        self.apply(Mutation::Update(id, draft)).await
    }

    pub async fn delete(&self, id: RecordId) -> Result<(), ApiError> {
        self.apply(Mutation::Delete(id)).await
    }

    pub async fn apply(&self, mutation: Mutation<R::Draft>) -> Result<(), ApiError> {
        let (done, doing) = mutation.verbs();
        let label = R::KIND.label();
        match self.execute(mutation).await {
            Ok(()) => {
                self.notifier
                    .success(&format!("{} {done} successfully", capitalize(label)));
                self.refresh.fire();
                Ok(())
            }
            Err(e) => {
                warn!(kind = label, error = %e, "mutation failed");
                self.notifier
                    .error(&format!("Error {doing} {label}: {e}. Please try again."));
                Err(e)
            }
        }
    }

    async fn execute(&self, mutation: Mutation<R::Draft>) -> Result<(), ApiError> {
        match mutation {
            Mutation::Create(draft) => {
                let draft = self.prepare(draft)?;
                let path = R::KIND.collection_path();
                debug!(kind = %R::KIND, "creating record");
                let _: serde_json::Value = self.client.post(path, &draft).await?;
            }
            Mutation::Update(id, draft) => {
                let draft = self.prepare(draft)?;
                let path = R::KIND.item_path(id);
                debug!(kind = %R::KIND, %id, "updating record");
                let _: serde_json::Value = self.client.put(&path, &draft).await?;
            }
            Mutation::Delete(id) => {
                debug!(kind = %R::KIND, %id, "deleting record");
                self.client.delete(&R::KIND.item_path(id)).await?;
            }
        }
        Ok(())
    }

    fn prepare(&self, mut draft: R::Draft) -> Result<R::Draft, ApiError> {
        draft.validate()?;
        if let Some(user) = self.client.auth().user_id()? {
            draft.assign_user(user);
        }
        Ok(draft)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DialogState<F> {
    Closed,
    Open { form: F, error: Option<String> },
    Submitting { form: F },
}

#[derive(Debug, Error)]
pub enum DialogError {
    #[error("dialog is not open")]
    NotOpen,

    #[error("dialog is already open")]
    AlreadyOpen,

    #[error(transparent)]
    Request(#[from] ApiError),
}

/// Add/edit/delete dialog: `Closed -> Open -> Submitting -> Closed` on
/// success, back to `Open` with the error on failure.
#[derive(Clone, Debug, PartialEq)]
pub struct EditorDialog<F> {
    state: DialogState<F>,
}

impl<F> Default for EditorDialog<F> {
    fn default() -> Self {
        Self {
            state: DialogState::Closed,
        }
    }
}

impl<F: Clone> EditorDialog<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DialogState<F> {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, DialogState::Open { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, DialogState::Closed)
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            DialogState::Open { error, .. } => error.as_deref(),
            _ => None,
        }
    }

    pub fn open(&mut self, form: F) -> Result<(), DialogError> {
        if !self.is_closed() {
            return Err(DialogError::AlreadyOpen);
        }
        self.state = DialogState::Open { form, error: None };
        Ok(())
    }

    pub fn form_mut(&mut self) -> Option<&mut F> {
        match &mut self.state {
            DialogState::Open { form, .. } => Some(form),
            _ => None,
        }
    }

    /// Closing discards the form.
    pub fn cancel(&mut self) {
        self.state = DialogState::Closed;
    }

    pub async fn submit<R, M>(
        &mut self,
        editor: &RecordEditor<R>,
        to_mutation: M,
    ) -> Result<(), DialogError>
    where
        R: Record,
        M: FnOnce(F) -> Mutation<R::Draft>,
    {
        let form = match std::mem::replace(&mut self.state, DialogState::Closed) {
            DialogState::Open { form, .. } => form,
            other => {
                self.state = other;
                return Err(DialogError::NotOpen);
            }
        };

        self.state = DialogState::Submitting { form: form.clone() };
        let guard = SubmitGuard {
            state: &mut self.state,
        };
        match editor.apply(to_mutation(form.clone())).await {
            Ok(()) => {
                *guard.state = DialogState::Closed;
                Ok(())
            }
            Err(e) => {
                *guard.state = DialogState::Open {
                    form,
                    error: Some(e.to_string()),
                };
                Err(DialogError::Request(e))
            }
        }
    }
}

/// Reopens the form if a submit future is dropped before the request
/// settles, so the dialog never sticks in `Submitting`.
struct SubmitGuard<'a, F> {
    state: &'a mut DialogState<F>,
}

impl<F> Drop for SubmitGuard<'_, F> {
    fn drop(&mut self) {
        let state = std::mem::replace(self.state, DialogState::Closed);
        *self.state = match state {
            DialogState::Submitting { form } => DialogState::Open { form, error: None },
            other => other,
        };
    }
}
