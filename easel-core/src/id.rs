//! # IDs
//!
//! Two flavors of identity live here. [`ElementId`] is the stable, universally
//! unique identity of a scene element. It survives "not for new" copies
//! (undo snapshots, grouping internals) and is regenerated for "for new"
//! copies (paste, duplicate). [`FuzzID`] is a cheaper process-unique ID,
//! namespaced by a marker type, used for identities that never leave the
//! process (documents, sessions).

/// Whether a copy keeps the original's identity or mints a fresh one.
///
/// History snapshots and group internals copy [`NotForNew`](CopyKind::NotForNew)
/// so that undo restores the *same* elements. Paste and duplicate copy
/// [`ForNew`](CopyKind::ForNew).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CopyKind {
    ForNew,
    NotForNew,
}

/// Stable unique identity of an element, immutable for the element's lifetime.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(uuid::Uuid);

impl ElementId {
    /// Mint a fresh, universally unique identity.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
    /// Re-establish an identity from persisted state.
    #[must_use]
    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
    #[must_use]
    pub fn uuid(&self) -> uuid::Uuid {
        self.0
    }
}
impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}
impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Braced form is noisy in logs. First eight hex chars is plenty for a human.
        let simple = self.0.simple().to_string();
        write!(f, "element#{}", &simple[..8])
    }
}
impl std::fmt::Debug for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

// Next available ID per namespace type.
static ID_SERVER: parking_lot::RwLock<
    std::collections::BTreeMap<std::any::TypeId, std::sync::atomic::AtomicU64>,
> = parking_lot::const_rwlock(std::collections::BTreeMap::new());

/// ID guaranteed unique within this execution of the program, namespaced by
/// the marker type `T`. IDs of different namespaces may share a numeric value
/// but are distinct types. Not stable across executions - never persist one.
pub struct FuzzID<T: std::any::Any> {
    id: std::num::NonZeroU64,
    // Namespace marker.
    _phantom: std::marker::PhantomData<T>,
}
impl<T: std::any::Any> Clone for FuzzID<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T: std::any::Any> Copy for FuzzID<T> {}
impl<T: std::any::Any> PartialEq for FuzzID<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<T: std::any::Any> Eq for FuzzID<T> {}
// A FuzzID is just a u64. The phantom `T` must not infect Send/Sync.
unsafe impl<T: std::any::Any> Send for FuzzID<T> {}
unsafe impl<T: std::any::Any> Sync for FuzzID<T> {}
impl<T: std::any::Any> std::hash::Hash for FuzzID<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::any::TypeId::of::<T>().hash(state);
        self.id.hash(state);
    }
}

impl<T: std::any::Any> FuzzID<T> {
    /// Raw numeric value. IDs from differing namespaces may collide numerically!
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id.get()
    }
    /// Allocate the next ID in this namespace.
    #[must_use]
    pub fn next() -> Self {
        let raw = {
            let read = ID_SERVER.upgradable_read();
            let ty = std::any::TypeId::of::<T>();
            if let Some(atomic) = read.get(&ty) {
                atomic.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            } else {
                // First allocation in this namespace - take the write lock once.
                let mut write = parking_lot::RwLockUpgradableReadGuard::upgrade(read);
                write.insert(ty, 2.into());
                1
            }
        };
        let Some(id) = std::num::NonZeroU64::new(raw) else {
            // Exhausting u64::MAX ids is unreachable in practice, but global
            // uniqueness is unrecoverable once it happens.
            log::error!("{} ID overflow! Aborting!", std::any::type_name::<T>());
            log::logger().flush();
            std::process::abort();
        };
        Self {
            id,
            _phantom: std::marker::PhantomData,
        }
    }
}
impl<T: std::any::Any> Default for FuzzID<T> {
    fn default() -> Self {
        Self::next()
    }
}
impl<T: std::any::Any> std::fmt::Display for FuzzID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Unwrap ok - rsplit always yields at least one item, even for "".
        write!(
            f,
            "{}#{}",
            std::any::type_name::<T>().rsplit("::").next().unwrap(),
            self.id
        )
    }
}
impl<T: std::any::Any> std::fmt::Debug for FuzzID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}
