//! Reconciliation between store-issued identifiers and internal integers.
//!
//! Backing stores may issue their own opaque identifiers (UUIDs, row keys)
//! instead of the small integers the rest of the application works with.
//! An [IdMap] binds the two, so opaque identifiers never leak past the
//! ledger. The map is rebuilt from scratch on every full load: internal IDs
//! are stable within one session only.

use std::collections::HashMap;

/// An identifier issued by a backing store. Opaque to the application.
pub type ExternalId = String;

/// A bidirectional, first-seen-wins mapping between external identifiers and
/// sequential internal integers.
#[derive(Debug, Clone, Default)]
pub struct IdMap {
    external_to_internal: HashMap<ExternalId, i64>,
    internal_to_external: HashMap<i64, ExternalId>,
    next_internal: i64,
}

impl IdMap {
    /// An empty map whose first assigned internal ID is 1.
    pub fn new() -> Self {
        Self {
            external_to_internal: HashMap::new(),
            internal_to_external: HashMap::new(),
            next_internal: 1,
        }
    }

    /// The internal ID bound to `external`, binding the next unused
    /// sequential integer on first observation.
    ///
    /// Bindings are stable for the lifetime of the map.
    pub fn to_internal(&mut self, external: &str) -> i64 {
        if let Some(&internal) = self.external_to_internal.get(external) {
            return internal;
        }

        let internal = self.next_internal;
        self.next_internal += 1;
        self.external_to_internal.insert(external.to_owned(), internal);
        self.internal_to_external.insert(internal, external.to_owned());

        internal
    }

    /// The external identifier bound to `internal`, if any.
    ///
    /// `None` means the internal ID was never bound or its record was
    /// deleted. Callers about to mutate the backing store must treat this
    /// as a fatal precondition failure.
    pub fn to_external(&self, internal: i64) -> Option<&str> {
        self.internal_to_external
            .get(&internal)
            .map(String::as_str)
    }

    /// Remove the binding for `internal`.
    ///
    /// The integer is never handed out again: the sequence counter is not
    /// rewound on removal.
    pub fn remove_internal(&mut self, internal: i64) {
        if let Some(external) = self.internal_to_external.remove(&internal) {
            self.external_to_internal.remove(&external);
        }
    }

    /// How many bindings the map currently holds.
    pub fn len(&self) -> usize {
        self.internal_to_external.len()
    }

    /// Whether the map holds no bindings.
    pub fn is_empty(&self) -> bool {
        self.internal_to_external.is_empty()
    }
}
