//! Reversible method-slot overrides.
//!
//! [`OverrideRegistry`] tracks which slots on which host objects have been
//! replaced, keeps the captured originals, and can put everything back.
//! Each layout module owns one registry per enable cycle; unrelated
//! modules never share a registry, so their captured originals cannot
//! interfere.
//!
//! Targets are held as [`Weak`] references.  The host rebuilds parts of
//! its object graph out-of-band (monitor reconfiguration, competing
//! extensions), so by the time a registry is torn down a target may be
//! gone.  Restore is best-effort per record and never aborts the rest of
//! the teardown.

use crate::host::{HostObject, Method, ObjectRef};
use log::{debug, warn};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Errors from registering an override.
///
/// Both variants are programming errors on the caller's side and are
/// raised before any slot has been touched.
#[derive(Debug, thiserror::Error)]
pub enum OverrideError {
    /// An override with this name is already registered in this registry.
    #[error("override {0:?} is already registered")]
    DuplicateName(String),

    /// A slot in the patch table is already patched by this registry, or
    /// appears twice in the same table.
    #[error("slot {slot:?} on {target:?} is already patched (override {holder:?})")]
    SlotConflict {
        slot: String,
        target: String,
        holder: String,
    },
}

/// One replaced slot: the key, the captured original, and whether the
/// replacement is currently installed.
///
/// `original` is `None` when the slot did not exist before the patch; the
/// restore then deletes the slot instead of writing an empty value back.
struct PatchRecord {
    method: String,
    original: Option<Method>,
    installed: bool,
}

/// One named override: a target and the records for every slot it patched.
struct OverrideEntry {
    name: String,
    target: Weak<RefCell<HostObject>>,
    records: Vec<PatchRecord>,
}

/// An ordered collection of named overrides.
///
/// Insertion order is preserved and teardown runs in reverse, so layered
/// patches on the same object unwind in the right order.  Within one
/// registry a `(target, slot)` pair may be patched at most once; a second
/// registration for the same slot fails loudly instead of silently
/// dropping the earlier original.
#[derive(Default)]
pub struct OverrideRegistry {
    entries: Vec<OverrideEntry>,
}

impl OverrideRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of named overrides currently registered.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no overrides.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace every slot named in `table` on `target`, capturing the
    /// current implementations for later restore.
    ///
    /// The whole table is validated before any slot is touched, so a
    /// failed call leaves the target exactly as it was.  On success the
    /// target is mutated immediately, with no staging step.
    pub fn add_override(
        &mut self,
        name: &str,
        target: &ObjectRef,
        table: &[(&str, Method)],
    ) -> Result<(), OverrideError> {
        if self.entries.iter().any(|e| e.name == name) {
            return Err(OverrideError::DuplicateName(name.to_string()));
        }

        let target_label = target.borrow().name().to_string();
        for (i, (slot, _)) in table.iter().enumerate() {
            // The same slot twice in one table would capture the first
            // replacement as the "original" of the second.
            if table[..i].iter().any(|(s, _)| s == slot) {
                return Err(OverrideError::SlotConflict {
                    slot: (*slot).to_string(),
                    target: target_label.clone(),
                    holder: name.to_string(),
                });
            }
            if let Some(holder) = self.holder_of(target, slot) {
                return Err(OverrideError::SlotConflict {
                    slot: (*slot).to_string(),
                    target: target_label.clone(),
                    holder,
                });
            }
        }

        let mut records = Vec::with_capacity(table.len());
        {
            let mut obj = target.borrow_mut();
            for (slot, replacement) in table {
                let original = obj.slot(slot);
                obj.set_slot(*slot, replacement.clone());
                records.push(PatchRecord {
                    method: (*slot).to_string(),
                    original,
                    installed: true,
                });
            }
        }
        debug!("override {:?}: patched {} slot(s) on {}", name, records.len(), target_label);

        self.entries.push(OverrideEntry {
            name: name.to_string(),
            target: Rc::downgrade(target),
            records,
        });
        Ok(())
    }

    /// Restore and forget the override registered under `name`.
    ///
    /// Returns `false` (without error) when no such override exists, so
    /// redundant teardown paths stay cheap.
    pub fn remove_override(&mut self, name: &str) -> bool {
        match self.entries.iter().position(|e| e.name == name) {
            Some(index) => {
                let mut entry = self.entries.remove(index);
                restore_entry(&mut entry);
                true
            }
            None => false,
        }
    }

    /// Restore every override in reverse order of registration.
    ///
    /// A no-op on an empty registry.  A target that has been dropped by
    /// the host is skipped with a log line; the remaining overrides are
    /// still restored.
    pub fn remove_all(&mut self) {
        while let Some(mut entry) = self.entries.pop() {
            restore_entry(&mut entry);
        }
    }

    /// Name of the override currently holding a patch on `(target, slot)`.
    fn holder_of(&self, target: &ObjectRef, slot: &str) -> Option<String> {
        self.entries
            .iter()
            .find(|e| {
                e.target.upgrade().is_some_and(|t| Rc::ptr_eq(&t, target))
                    && e.records.iter().any(|r| r.installed && r.method == slot)
            })
            .map(|e| e.name.clone())
    }
}

/// Put every captured original of one entry back, newest record first.
fn restore_entry(entry: &mut OverrideEntry) {
    let Some(target) = entry.target.upgrade() else {
        warn!("override {:?}: target is gone, skipping restore", entry.name);
        return;
    };
    let mut obj = target.borrow_mut();
    for record in entry.records.iter_mut().rev() {
        if !record.installed {
            continue;
        }
        match record.original.take() {
            Some(original) => obj.set_slot(record.method.clone(), original),
            None => obj.remove_slot(&record.method),
        }
        record.installed = false;
    }
    debug!("override {:?}: restored on {}", entry.name, obj.name());
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{method, object_ref, HostObject};

    fn target_with(slots: &[&str]) -> ObjectRef {
        let mut obj = HostObject::new("target");
        for slot in slots {
            let label = slot.to_string();
            obj.set_slot(*slot, method(move |o| {
                o.set_prop("last-call", format!("stock:{label}"));
            }));
        }
        object_ref(obj)
    }

    fn noop() -> Method {
        method(|_| {})
    }

    #[test]
    fn add_installs_replacement_immediately() {
        let target = target_with(&["show"]);
        let mut reg = OverrideRegistry::new();
        reg.add_override("A", &target, &[("show", method(|o| {
            o.set_prop("last-call", "patched");
        }))])
        .unwrap();

        target.borrow_mut().call("show").unwrap();
        assert_eq!(target.borrow().prop_str("last-call"), Some("patched"));
    }

    #[test]
    fn remove_all_restores_exact_originals() {
        let target = target_with(&["show", "hide"]);
        let original_show = target.borrow().slot("show").unwrap();
        let original_hide = target.borrow().slot("hide").unwrap();

        let mut reg = OverrideRegistry::new();
        reg.add_override("A", &target, &[("show", noop()), ("hide", noop())])
            .unwrap();
        reg.remove_all();

        let restored_show = target.borrow().slot("show").unwrap();
        let restored_hide = target.borrow().slot("hide").unwrap();
        assert!(Rc::ptr_eq(&original_show, &restored_show));
        assert!(Rc::ptr_eq(&original_hide, &restored_hide));
        assert!(reg.is_empty());
    }

    #[test]
    fn round_trip_over_disjoint_targets() {
        let a = target_with(&["one"]);
        let b = target_with(&["two"]);
        let orig_a = a.borrow().slot("one").unwrap();
        let orig_b = b.borrow().slot("two").unwrap();

        let mut reg = OverrideRegistry::new();
        reg.add_override("A", &a, &[("one", noop())]).unwrap();
        reg.add_override("B", &b, &[("two", noop())]).unwrap();
        reg.remove_all();

        assert!(Rc::ptr_eq(&orig_a, &a.borrow().slot("one").unwrap()));
        assert!(Rc::ptr_eq(&orig_b, &b.borrow().slot("two").unwrap()));
    }

    #[test]
    fn absent_slot_is_deleted_on_restore() {
        let target = target_with(&[]);
        let mut reg = OverrideRegistry::new();
        reg.add_override("A", &target, &[("helper", noop())]).unwrap();
        assert!(target.borrow().has_slot("helper"));

        reg.remove_all();
        assert!(
            !target.borrow().has_slot("helper"),
            "slot that did not exist before the patch must be deleted, not restored"
        );
    }

    #[test]
    fn duplicate_name_fails() {
        let target = target_with(&["show", "hide"]);
        let mut reg = OverrideRegistry::new();
        reg.add_override("A", &target, &[("show", noop())]).unwrap();
        let err = reg.add_override("A", &target, &[("hide", noop())]).unwrap_err();
        assert!(matches!(err, OverrideError::DuplicateName(_)));
    }

    #[test]
    fn slot_conflict_fails_and_leaves_first_patch_intact() {
        let target = target_with(&["show"]);
        let mut reg = OverrideRegistry::new();
        let first = method(|o: &mut HostObject| o.set_prop("last-call", "first"));
        reg.add_override("A", &target, &[("show", first.clone())]).unwrap();

        let err = reg
            .add_override("B", &target, &[("show", noop())])
            .unwrap_err();
        assert!(matches!(err, OverrideError::SlotConflict { .. }));

        // The slot still holds the first replacement, not the rejected one.
        let current = target.borrow().slot("show").unwrap();
        assert!(Rc::ptr_eq(&current, &first));
    }

    #[test]
    fn conflict_within_one_table_applies_nothing() {
        let target = target_with(&["show"]);
        let original = target.borrow().slot("show").unwrap();
        let mut reg = OverrideRegistry::new();

        let err = reg
            .add_override("A", &target, &[("show", noop()), ("show", noop())])
            .unwrap_err();
        assert!(matches!(err, OverrideError::SlotConflict { .. }));

        // Validation happens before any assignment.
        let current = target.borrow().slot("show").unwrap();
        assert!(Rc::ptr_eq(&current, &original));
        assert!(reg.is_empty());
    }

    #[test]
    fn same_slot_on_different_targets_is_fine() {
        let a = target_with(&["show"]);
        let b = target_with(&["show"]);
        let mut reg = OverrideRegistry::new();
        reg.add_override("A", &a, &[("show", noop())]).unwrap();
        reg.add_override("B", &b, &[("show", noop())]).unwrap();
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn reregister_after_remove_is_fine() {
        let target = target_with(&["show"]);
        let mut reg = OverrideRegistry::new();
        reg.add_override("A", &target, &[("show", noop())]).unwrap();
        assert!(reg.remove_override("A"));
        reg.add_override("A", &target, &[("show", noop())]).unwrap();
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn remove_all_on_empty_registry_is_a_noop() {
        let mut reg = OverrideRegistry::new();
        reg.remove_all();
        assert!(reg.is_empty());
    }

    #[test]
    fn remove_unknown_name_is_a_noop() {
        let mut reg = OverrideRegistry::new();
        assert!(!reg.remove_override("ghost"));
    }

    #[test]
    fn dead_target_is_skipped_but_others_restore() {
        let alive = target_with(&["show"]);
        let original = alive.borrow().slot("show").unwrap();

        let mut reg = OverrideRegistry::new();
        {
            let doomed = target_with(&["show"]);
            reg.add_override("doomed", &doomed, &[("show", noop())]).unwrap();
            // `doomed` drops here; the registry only holds a Weak.
        }
        reg.add_override("alive", &alive, &[("show", noop())]).unwrap();

        reg.remove_all();
        let restored = alive.borrow().slot("show").unwrap();
        assert!(Rc::ptr_eq(&original, &restored));
        assert!(reg.is_empty());
    }

    #[test]
    fn teardown_unwinds_in_reverse_order() {
        // Two entries layer the same slot via remove/re-add: the later
        // entry must unwind first so the earlier original wins in the end.
        let target = target_with(&["show"]);
        let original = target.borrow().slot("show").unwrap();

        let mut reg = OverrideRegistry::new();
        reg.add_override("first", &target, &[("show", noop())]).unwrap();
        let first_replacement = target.borrow().slot("show").unwrap();

        // A second registry models an unrelated module layering on top.
        let mut upper = OverrideRegistry::new();
        upper.add_override("second", &target, &[("show", noop())]).unwrap();

        upper.remove_all();
        assert!(Rc::ptr_eq(&first_replacement, &target.borrow().slot("show").unwrap()));

        reg.remove_all();
        assert!(Rc::ptr_eq(&original, &target.borrow().slot("show").unwrap()));
    }
}
