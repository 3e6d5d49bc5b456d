//! Plan cache and recursion guard.
//!
//! Every generated method lives in a slot of the cache arena. A slot is created in the
//! `InProgress` state *before* its body is built, so a nested request for the same
//! [`MappingKey`] (a self-referential type graph) gets a deferred reference to the
//! already-named method instead of recursing.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use nova_mapper_config::MapperOptions;
use nova_mapper_types::TypeRef;
use parking_lot::Mutex;

use crate::plan::{MappingPlan, MethodRef, PlanId};
use crate::CACHE_TARGET;

/// Which subset of the options can change a plan for a type pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionScope {
    /// Casts, parse and `ToString` conversions.
    Conversions,
    /// Enum to enum/string pairs.
    Enum,
    /// Objects, collections and anything else that may recurse into members.
    Graph,
}

/// Cache key of a generated mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MappingKey {
    pub source: TypeRef,
    pub target: TypeRef,
    /// Maps into an existing target instance.
    pub existing: bool,
    pub fingerprint: u64,
}

impl MappingKey {
    pub fn new(
        source: TypeRef,
        target: TypeRef,
        existing: bool,
        options: &MapperOptions,
        scope: OptionScope,
    ) -> Self {
        Self {
            source,
            target,
            existing,
            fingerprint: fingerprint(options, scope),
        }
    }
}

/// Hash of the options in `scope`. Options that only affect diagnostics never take part.
pub fn fingerprint(options: &MapperOptions, scope: OptionScope) -> u64 {
    let mut hasher = DefaultHasher::new();
    options.enabled_conversions.hash(&mut hasher);
    match scope {
        OptionScope::Conversions => {}
        OptionScope::Enum => hash_enum_options(options, &mut hasher),
        OptionScope::Graph => {
            hash_enum_options(options, &mut hasher);
            options.throw_on_mapping_null_mismatch.hash(&mut hasher);
            options.throw_on_property_mapping_null_mismatch.hash(&mut hasher);
            options.allow_null_property_assignment.hash(&mut hasher);
            options.property_name_mapping_strategy.hash(&mut hasher);
            options.included_members.hash(&mut hasher);
            options.included_constructors.hash(&mut hasher);
            options.use_reference_handling.hash(&mut hasher);
            options.deep_cloning.hash(&mut hasher);
        }
    }
    hasher.finish()
}

fn hash_enum_options(options: &MapperOptions, hasher: &mut DefaultHasher) {
    options.enum_mapping_strategy.hash(hasher);
    options.enum_mapping_ignore_case.hash(hasher);
    options.enum_naming_strategy.hash(hasher);
}

#[derive(Debug, Clone)]
enum SlotState {
    /// Declared method whose body is built later.
    Reserved,
    InProgress { owner: ThreadId },
    Ready(Arc<MappingPlan>),
    Failed,
}

#[derive(Debug)]
struct Slot {
    name: String,
    state: SlotState,
    ref_handler: bool,
    /// A deferred reference to this slot was handed out.
    referenced: bool,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<MappingKey, PlanId>,
    slots: Vec<Slot>,
    names: HashSet<String>,
}

impl CacheInner {
    fn push(&mut self, name: String, state: SlotState, ref_handler: bool) -> PlanId {
        let id = PlanId(self.slots.len() as u32);
        self.names.insert(name.clone());
        self.slots.push(Slot {
            name,
            state,
            ref_handler,
            referenced: false,
        });
        id
    }

    fn unique_name(&self, base: &str) -> String {
        if !self.names.contains(base) {
            return base.to_string();
        }
        (1..)
            .map(|n| format!("{base}{n}"))
            .find(|candidate| !self.names.contains(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    fn method_ref(&self, id: PlanId, deferred: bool) -> MethodRef {
        let slot = &self.slots[id.0 as usize];
        MethodRef {
            plan: id,
            name: slot.name.clone(),
            deferred,
            ref_handler: slot.ref_handler,
        }
    }
}

fn find_locked(inner: &mut CacheInner, key: &MappingKey) -> Option<Lookup> {
    let id = *inner.entries.get(key)?;
    let state = inner.slots[id.0 as usize].state.clone();
    Some(match state {
        SlotState::Ready(_) => {
            tracing::trace!(target: CACHE_TARGET, plan = id.0, "cache hit");
            Lookup::Hit(inner.method_ref(id, false))
        }
        SlotState::Failed => Lookup::Failed,
        SlotState::Reserved | SlotState::InProgress { .. } => {
            if let SlotState::InProgress { owner } = state {
                if owner != thread::current().id() {
                    tracing::debug!(
                        target: CACHE_TARGET,
                        plan = id.0,
                        "plan in progress on another thread, deferring"
                    );
                }
            }
            inner.slots[id.0 as usize].referenced = true;
            tracing::trace!(target: CACHE_TARGET, plan = id.0, "deferred reference");
            Lookup::Deferred(inner.method_ref(id, true))
        }
    })
}

/// Outcome of [`PlanCache::lookup_or_begin`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// A finished plan exists.
    Hit(MethodRef),
    /// The plan is still being built (or is a declared method not built yet).
    Deferred(MethodRef),
    /// An earlier attempt for this key produced no plan.
    Failed,
    /// A fresh slot was created and marked in progress; the caller builds it.
    Begin(MethodRef),
}

/// Arena of mapping plans for one mapper.
#[derive(Debug, Default)]
pub struct PlanCache {
    inner: Mutex<CacheInner>,
}

impl PlanCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a slot for a declared or user-implemented method with a fixed name.
    ///
    /// Returns `false` as second element when `key` was already taken; the new slot is then
    /// not reachable through lookups.
    pub fn reserve(&self, key: Option<MappingKey>, name: &str) -> (PlanId, bool) {
        let mut inner = self.inner.lock();
        let id = inner.push(name.to_string(), SlotState::Reserved, false);
        let registered = match key {
            Some(key) if !inner.entries.contains_key(&key) => {
                inner.entries.insert(key, id);
                true
            }
            Some(_) => false,
            None => true,
        };
        tracing::trace!(target: CACHE_TARGET, name, registered, "reserved declared method");
        (id, registered)
    }

    /// Look `key` up without creating anything.
    pub fn find(&self, key: &MappingKey) -> Option<Lookup> {
        find_locked(&mut self.inner.lock(), key)
    }

    /// Look `key` up, creating an in-progress slot named after `base_name` on a miss.
    pub fn lookup_or_begin(&self, key: &MappingKey, base_name: &str, ref_handler: bool) -> Lookup {
        let mut inner = self.inner.lock();
        if let Some(found) = find_locked(&mut inner, key) {
            return found;
        }
        let name = inner.unique_name(base_name);
        let id = inner.push(
            name,
            SlotState::InProgress {
                owner: thread::current().id(),
            },
            ref_handler,
        );
        inner.entries.insert(*key, id);
        tracing::trace!(target: CACHE_TARGET, plan = id.0, "cache miss");
        Lookup::Begin(inner.method_ref(id, false))
    }

    /// Mark a reserved slot as being built by the current thread.
    pub fn begin_reserved(&self, id: PlanId) -> MethodRef {
        let mut inner = self.inner.lock();
        let slot = &mut inner.slots[id.0 as usize];
        if matches!(slot.state, SlotState::Reserved) {
            slot.state = SlotState::InProgress {
                owner: thread::current().id(),
            };
        }
        inner.method_ref(id, false)
    }

    /// Store the finished plan of `id`.
    pub fn complete(&self, plan: MappingPlan) -> Arc<MappingPlan> {
        let plan = Arc::new(plan);
        let mut inner = self.inner.lock();
        let slot = &mut inner.slots[plan.id.0 as usize];
        slot.state = SlotState::Ready(Arc::clone(&plan));
        tracing::trace!(target: CACHE_TARGET, plan = plan.id.0, name = %plan.name, "plan ready");
        plan
    }

    /// Mark `id` as failed. Returns whether a deferred reference to it was handed out, in which
    /// case the caller still has to [`complete`](Self::complete) it with a stub.
    pub fn fail(&self, id: PlanId) -> bool {
        let mut inner = self.inner.lock();
        let slot = &mut inner.slots[id.0 as usize];
        if slot.referenced {
            return true;
        }
        slot.state = SlotState::Failed;
        tracing::trace!(target: CACHE_TARGET, plan = id.0, "plan failed");
        false
    }

    pub fn plan(&self, id: PlanId) -> Option<Arc<MappingPlan>> {
        match &self.inner.lock().slots.get(id.0 as usize)?.state {
            SlotState::Ready(plan) => Some(Arc::clone(plan)),
            _ => None,
        }
    }

    pub fn method_ref(&self, id: PlanId) -> MethodRef {
        self.inner.lock().method_ref(id, false)
    }

    /// Finished plans in creation order.
    pub fn plans(&self) -> Vec<Arc<MappingPlan>> {
        self.inner
            .lock()
            .slots
            .iter()
            .filter_map(|slot| match &slot.state {
                SlotState::Ready(plan) => Some(Arc::clone(plan)),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{PlanKind, Signature, Visibility};
    use nova_mapper_config::EnumMappingStrategy;
    use nova_mapper_types::{Severity, TypeId};

    fn key(source: u32, target: u32) -> MappingKey {
        MappingKey::new(
            TypeRef::new(TypeId::from_raw(source)),
            TypeRef::new(TypeId::from_raw(target)),
            false,
            &MapperOptions::default(),
            OptionScope::Graph,
        )
    }

    fn plan(method: &MethodRef) -> MappingPlan {
        MappingPlan {
            id: method.plan,
            name: method.name.clone(),
            kind: PlanKind::NewInstance,
            source: None,
            target: None,
            signature: Signature {
                visibility: Visibility::Private,
                return_type: None,
                type_params: Vec::new(),
                params: Vec::new(),
            },
            body: Vec::new(),
        }
    }

    #[test]
    fn reentry_is_deferred_and_completion_is_shared() {
        let cache = PlanCache::new();
        let Lookup::Begin(first) = cache.lookup_or_begin(&key(1, 2), "MapToB", false) else {
            panic!("expected a fresh slot");
        };
        let Lookup::Deferred(again) = cache.lookup_or_begin(&key(1, 2), "MapToB", false) else {
            panic!("expected a deferred reference");
        };
        assert_eq!(again.plan, first.plan);
        assert!(again.deferred);

        let done = cache.complete(plan(&first));
        let Lookup::Hit(hit) = cache.lookup_or_begin(&key(1, 2), "MapToB", false) else {
            panic!("expected a hit");
        };
        assert!(!hit.deferred);
        let stored = cache.plan(hit.plan).expect("plan is ready");
        assert!(Arc::ptr_eq(&done, &stored));
    }

    #[test]
    fn names_are_unique() {
        let cache = PlanCache::new();
        cache.reserve(None, "MapToB");
        let Lookup::Begin(generated) = cache.lookup_or_begin(&key(1, 2), "MapToB", false) else {
            panic!("expected a fresh slot");
        };
        assert_eq!(generated.name, "MapToB1");
    }

    #[test]
    fn duplicate_reservations_are_not_registered() {
        let cache = PlanCache::new();
        let (_, first) = cache.reserve(Some(key(1, 2)), "Map");
        let (_, second) = cache.reserve(Some(key(1, 2)), "Map2");
        assert!(first);
        assert!(!second);
    }

    #[test]
    fn failed_slots_need_a_stub_only_when_referenced() {
        let cache = PlanCache::new();
        let Lookup::Begin(slot) = cache.lookup_or_begin(&key(1, 2), "MapToB", false) else {
            panic!("expected a fresh slot");
        };
        assert!(!cache.fail(slot.plan));
        assert_eq!(cache.lookup_or_begin(&key(1, 2), "MapToB", false), Lookup::Failed);

        let Lookup::Begin(slot) = cache.lookup_or_begin(&key(3, 4), "MapToD", false) else {
            panic!("expected a fresh slot");
        };
        cache.lookup_or_begin(&key(3, 4), "MapToD", false);
        assert!(cache.fail(slot.plan));
    }

    #[test]
    fn fingerprint_ignores_irrelevant_options() {
        let base = MapperOptions::default();
        let mut diagnostics_only = base.clone();
        diagnostics_only
            .severity_overrides
            .insert("SourceMemberNotFound".to_string(), Severity::Error);
        diagnostics_only.suppress_null_mismatch_diagnostic = true;
        assert_eq!(
            fingerprint(&base, OptionScope::Graph),
            fingerprint(&diagnostics_only, OptionScope::Graph)
        );

        let mut deep = base.clone();
        deep.deep_cloning = true;
        assert_ne!(
            fingerprint(&base, OptionScope::Graph),
            fingerprint(&deep, OptionScope::Graph)
        );
        assert_eq!(
            fingerprint(&base, OptionScope::Enum),
            fingerprint(&deep, OptionScope::Enum)
        );

        let mut by_name = base.clone();
        by_name.enum_mapping_strategy = EnumMappingStrategy::ByName;
        assert_ne!(
            fingerprint(&base, OptionScope::Enum),
            fingerprint(&by_name, OptionScope::Enum)
        );
    }
}
