//! engine::document
//!
//! A backing store paired with its typed component tree.
//!
//! # Architecture
//!
//! [`Document`] owns both halves and is the only way to change either:
//!
//! - Typed mutations run inside a transaction. Each one writes the store,
//!   records a journal step, and updates the model in place.
//! - Out-of-band edits go through [`Document::edit_store`] or
//!   [`Document::reload`]; the store records structural events and the
//!   document feeds them to the sync engine afterwards.
//!
//! # Transaction lifecycle
//!
//! ```text
//! begin:    sync pending events -> lock store -> open journal -> snapshot model
//! mutate:   validate -> store write -> journal step -> model update
//! commit:   close journal -> unlock -> drain events -> sync (no-op replay)
//! rollback: undo journal in reverse -> drop events -> restore snapshot -> unlock
//! ```

use crate::core::config::{Config, FormatConfig};
use crate::core::ops::{Journal, StepKind};
use crate::core::schema::{Schema, Variant};
use crate::core::types::{ComponentId, ElementId, Fingerprint};
use crate::model::arena::{ArenaError, Model};
use crate::model::component::{Component, Module};
use crate::model::factory::{self, ComponentFactory};
use crate::store::diff::ReloadOutcome;
use crate::store::{BackingStore, DomStore, StoreError, StructuralEvent};

use super::sync::{self, SyncError, SyncReport};
use super::transaction::{TransactionError, TransactionGuard};
use super::verify;

struct OpenTransaction {
    journal: Journal,
    snapshot: Model,
}

/// A module descriptor: raw element tree plus typed view.
pub struct Document<S: BackingStore> {
    store: S,
    model: Model,
    format: FormatConfig,
    verify: bool,
    open: Option<OpenTransaction>,
    last_journal: Option<Journal>,
}

impl<S: BackingStore> Document<S> {
    /// Build the typed tree over `store` with default settings.
    ///
    /// A store without a `<module>` root yields a document with no module.
    pub fn load(store: S) -> Self {
        Self::load_with(store, &Config::default())
    }

    /// Build the typed tree over `store` with explicit settings.
    pub fn load_with(mut store: S, config: &Config) -> Self {
        // Anything recorded before load is already reflected in the tree.
        let stale = store.take_events();
        if !stale.is_empty() {
            tracing::debug!(events = stale.len(), "discarding events recorded before load");
        }
        let mut model = Model::new(Schema::module());
        factory::build_model(&mut model, &store);
        Self {
            store,
            model,
            format: config.format(),
            verify: config.verify_sync(),
            open: None,
            last_journal: None,
        }
    }

    /// The root module, or `None` if no module tree is available.
    pub fn module(&self) -> Option<Module> {
        self.model.root().map(Module::wrap)
    }

    /// The typed tree.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// The backing store, read-only.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Serialization settings in effect.
    pub fn format(&self) -> &FormatConfig {
        &self.format
    }

    /// The live component wrapping `element`.
    pub fn lookup(&self, element: ElementId) -> Option<ComponentId> {
        self.model.lookup(element)
    }

    /// The container `id` sits in.
    pub fn parent(&self, id: ComponentId) -> Option<ComponentId> {
        self.model.parent(id)
    }

    /// Whether `id` is reachable from the root module.
    pub fn is_attached(&self, id: ComponentId) -> bool {
        self.model.is_attached(id)
    }

    /// The variant of `id`.
    pub fn variant(&self, id: ComponentId) -> Option<Variant> {
        self.model.variant(id)
    }

    /// The backing element of `id`.
    pub fn element(&self, id: ComponentId) -> Option<ElementId> {
        self.model.element(id)
    }

    /// Re-type `id` as `C` if its variant matches.
    pub fn get<C: Component>(&self, id: ComponentId) -> Option<C> {
        (self.model.variant(id)? == C::VARIANT).then(|| C::wrap(id))
    }

    /// Check the typed tree against the store.
    pub fn verify(&self) -> Result<Fingerprint, SyncError> {
        verify::check(&self.model, &self.store)
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Whether a transaction is open.
    pub fn is_transaction_open(&self) -> bool {
        self.open.is_some()
    }

    /// The journal of the most recently finished transaction.
    pub fn last_journal(&self) -> Option<&Journal> {
        self.last_journal.as_ref()
    }

    /// Open a transaction.
    ///
    /// Pending out-of-band events are synced first so the snapshot taken
    /// here matches the store.
    ///
    /// # Errors
    ///
    /// - [`TransactionError::AlreadyOpen`] if one is already open
    /// - [`TransactionError::Store`] if the store lock is held elsewhere
    pub fn begin_transaction(&mut self) -> Result<(), TransactionError> {
        if self.open.is_some() {
            return Err(TransactionError::AlreadyOpen);
        }
        if self.store.pending_events() > 0 {
            self.sync()?;
        }

        let journal = Journal::new();
        self.store.lock_write(&journal.tx_id)?;
        tracing::debug!(tx = %journal.tx_id, "transaction opened");
        self.open = Some(OpenTransaction {
            journal,
            snapshot: self.model.clone(),
        });
        Ok(())
    }

    /// Commit the open transaction and reconcile.
    ///
    /// The transaction is closed and the lock released even when the
    /// reconciliation that follows reports an error.
    pub fn end_transaction(&mut self) -> Result<SyncReport, TransactionError> {
        let OpenTransaction { mut journal, .. } =
            self.open.take().ok_or(TransactionError::NotOpen)?;
        journal.commit();
        let unlocked = self.store.unlock_write(&journal.tx_id);
        tracing::debug!(
            tx = %journal.tx_id,
            steps = journal.steps.len(),
            structural = journal.structural_steps(),
            "transaction committed"
        );
        self.last_journal = Some(journal);
        unlocked?;

        Ok(self.sync()?)
    }

    /// Undo the open transaction.
    ///
    /// Store changes are reversed from the journal, the model returns to
    /// its state at [`begin_transaction`](Self::begin_transaction), and the
    /// lock is released. Every step is attempted; the first failure is
    /// returned after cleanup.
    pub fn rollback_transaction(&mut self) -> Result<(), TransactionError> {
        let OpenTransaction {
            mut journal,
            snapshot,
        } = self.open.take().ok_or(TransactionError::NotOpen)?;

        let mut first_error: Option<StoreError> = None;
        for step in journal.steps_for_undo() {
            if let Err(e) = undo_step(&mut self.store, step) {
                tracing::error!(tx = %journal.tx_id, error = %e, ?step, "undo step failed");
                first_error.get_or_insert(e);
            }
        }
        let discarded = self.store.take_events();
        self.model.restore(snapshot);
        journal.rollback();
        let unlocked = self.store.unlock_write(&journal.tx_id);
        tracing::debug!(
            tx = %journal.tx_id,
            steps = journal.steps.len(),
            discarded = discarded.len(),
            "transaction rolled back"
        );
        self.last_journal = Some(journal);

        unlocked?;
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Open a transaction that rolls back unless committed.
    pub fn transaction(&mut self) -> Result<TransactionGuard<'_, S>, TransactionError> {
        self.begin_transaction()?;
        Ok(TransactionGuard::new(self))
    }

    /// Run `f` inside a transaction.
    ///
    /// Commits when `f` returns `Ok`, rolls back when it returns `Err` or
    /// panics.
    pub fn transact<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Document<S>) -> Result<T, E>,
        E: From<TransactionError>,
    {
        let mut guard = self.transaction()?;
        let value = f(&mut guard)?;
        guard.commit()?;
        Ok(value)
    }

    /// Detached component constructors for the open transaction.
    pub fn factory(&mut self) -> Result<ComponentFactory<'_, S>, TransactionError> {
        let open = self.open.as_mut().ok_or(TransactionError::NotOpen)?;
        Ok(ComponentFactory::new(
            &mut self.model,
            &mut self.store,
            &mut open.journal,
        ))
    }

    // =========================================================================
    // Out-of-band edits and reconciliation
    // =========================================================================

    /// Drain the store's pending events and reconcile the typed tree.
    pub fn sync(&mut self) -> Result<SyncReport, SyncError> {
        let events = self.store.take_events();
        self.apply_events(&events)
    }

    /// Reconcile the typed tree against an explicit event batch.
    ///
    /// Batches that were already applied change nothing.
    pub fn apply_events(&mut self, events: &[StructuralEvent]) -> Result<SyncReport, SyncError> {
        if self.open.is_some() {
            return Err(SyncError::TransactionOpen);
        }
        let report = sync::apply(&mut self.model, &self.store, events);
        if self.verify {
            verify::check(&self.model, &self.store)?;
        }
        Ok(report)
    }

    /// Edit the store directly, then reconcile.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::WriteLocked` while a transaction holds the lock.
    pub fn edit_store<T>(&mut self, f: impl FnOnce(&mut S) -> T) -> Result<T, TransactionError> {
        if self.store.is_write_locked() {
            return Err(StoreError::WriteLocked.into());
        }
        let value = f(&mut self.store);
        self.sync()?;
        Ok(value)
    }

    // =========================================================================
    // Mutations (called by component handles)
    // =========================================================================

    fn require_open(&mut self) -> Result<&mut Journal, TransactionError> {
        self.open
            .as_mut()
            .map(|open| &mut open.journal)
            .ok_or(TransactionError::NotOpen)
    }

    fn element_of(&self, id: ComponentId) -> Result<ElementId, TransactionError> {
        self.model.element(id).ok_or(TransactionError::WrongModel(id))
    }

    pub(crate) fn read_attribute(&self, id: ComponentId, name: &str) -> Option<&str> {
        self.store.attribute(self.model.element(id)?, name)
    }

    pub(crate) fn write_attribute(
        &mut self,
        id: ComponentId,
        name: &str,
        value: Option<&str>,
    ) -> Result<(), TransactionError> {
        self.require_open()?;
        let element = self.element_of(id)?;
        let old = self.store.set_attribute(element, name, value)?;
        self.require_open()?.record(StepKind::SetAttribute {
            element,
            name: name.to_string(),
            old,
            new: value.map(str::to_string),
        })?;
        Ok(())
    }

    /// Attached children of `id` with their variants, in list order.
    pub(crate) fn attached_children(
        &self,
        id: ComponentId,
    ) -> impl Iterator<Item = (Variant, ComponentId)> + '_ {
        self.model
            .children(id)
            .iter()
            .filter(|c| self.model.is_attached(**c))
            .filter_map(|c| Some((self.model.variant(*c)?, *c)))
    }

    /// Put the detached `child` into `parent`'s list at `index`, or at the
    /// end.
    pub(crate) fn attach_child(
        &mut self,
        parent: ComponentId,
        child: ComponentId,
        index: Option<usize>,
    ) -> Result<(), TransactionError> {
        self.require_open()?;
        let parent_element = self.element_of(parent)?;
        let child_element = self.element_of(child)?;
        let (parent_variant, child_variant) = match (self.model.variant(parent), self.model.variant(child)) {
            (Some(p), Some(c)) => (p, c),
            _ => return Err(TransactionError::WrongModel(child)),
        };
        if parent_variant.hosted_list().is_none()
            || parent_variant.hosted_list() != child_variant.member_of()
        {
            return Err(ArenaError::Incompatible {
                parent: parent_variant,
                child: child_variant,
            }
            .into());
        }
        if self.model.parent(child).is_some() || self.model.root() == Some(child) {
            return Err(TransactionError::AlreadyParented(child));
        }

        let list = self.model.children(parent);
        let index = index.unwrap_or(list.len());
        if index > list.len() {
            return Err(ArenaError::IndexOutOfRange {
                index,
                len: list.len(),
            }
            .into());
        }
        // Land before the element that currently holds `index`.
        let store_index = match list.get(index).and_then(|next| self.model.element(*next)) {
            Some(next) => Some(self.store.index_of(parent_element, next).ok_or(
                StoreError::NotAChild {
                    parent: parent_element,
                    child: next,
                },
            )?),
            None => None,
        };

        let landed = self
            .store
            .insert_child(parent_element, child_element, store_index)?;
        self.require_open()?.record(StepKind::InsertChild {
            parent: parent_element,
            child: child_element,
            index: landed,
        })?;
        self.model.insert_at_index(parent, child, index)?;
        tracing::trace!(%parent, %child, index, variant = %child_variant, "attached component");
        Ok(())
    }

    /// Take `child` out of `parent`'s list. The component stays usable and
    /// can be added again.
    pub(crate) fn detach_child(
        &mut self,
        parent: ComponentId,
        child: ComponentId,
    ) -> Result<(), TransactionError> {
        self.require_open()?;
        let parent_element = self.element_of(parent)?;
        let child_element = self.element_of(child)?;
        if self.model.index_of(parent, child).is_none() {
            return Err(TransactionError::NotAChild { parent, child });
        }

        let index = self.store.remove_child(parent_element, child_element)?;
        self.require_open()?.record(StepKind::RemoveChild {
            parent: parent_element,
            child: child_element,
            index,
        })?;
        self.model.detach(child);
        tracing::trace!(%parent, %child, index, "detached component");
        Ok(())
    }
}

fn undo_step<S: BackingStore>(store: &mut S, step: &StepKind) -> Result<(), StoreError> {
    match step {
        StepKind::CreateElement { .. } => Ok(()),
        StepKind::SetAttribute {
            element, name, old, ..
        } => store
            .set_attribute(*element, name, old.as_deref())
            .map(|_| ()),
        StepKind::InsertChild { parent, child, .. } => {
            store.remove_child(*parent, *child).map(|_| ())
        }
        StepKind::RemoveChild {
            parent,
            child,
            index,
        } => store.insert_child(*parent, *child, Some(*index)).map(|_| ()),
    }
}

impl Document<DomStore> {
    /// Parse `text` and build the typed tree over it.
    ///
    /// # Example
    ///
    /// ```
    /// use gwtmodule::engine::Document;
    ///
    /// let doc = Document::from_xml(r#"<module><inherits name="a.B"/></module>"#).unwrap();
    /// let module = doc.module().unwrap();
    /// assert_eq!(module.inherits(&doc)[0].name(&doc), Some("a.B"));
    ///
    /// let orphan = Document::from_xml("<source/>").unwrap();
    /// assert!(orphan.module().is_none());
    /// ```
    pub fn from_xml(text: &str) -> Result<Self, StoreError> {
        Ok(Self::load(DomStore::parse(text)?))
    }

    /// Like [`from_xml`](Self::from_xml), with explicit settings.
    pub fn from_xml_with(text: &str, config: &Config) -> Result<Self, StoreError> {
        Ok(Self::load_with(DomStore::parse(text)?, config))
    }

    /// Replace the document text and reconcile incrementally.
    ///
    /// Components whose elements survive the reload keep their identity.
    /// If the root tag changed the typed tree is rebuilt from scratch.
    pub fn reload(&mut self, text: &str) -> Result<SyncReport, TransactionError> {
        if self.store.is_write_locked() {
            return Err(StoreError::WriteLocked.into());
        }
        match self.store.reload(text)? {
            ReloadOutcome::Patched => Ok(self.sync()?),
            ReloadOutcome::Replaced => {
                let _ = self.store.take_events();
                let mut model = Model::new(*self.model.schema());
                factory::build_model(&mut model, &self.store);
                self.model = model;
                tracing::debug!(components = self.model.len(), "document replaced on reload");
                Ok(SyncReport::default())
            }
        }
    }

    /// Serialize the document.
    pub fn to_xml(&self) -> String {
        self.store.to_xml(&self.format)
    }
}
