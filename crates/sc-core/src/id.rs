//! Object identifiers.
//!
//! Ids are interned strings so they stay readable in saved layouts
//! (`rect_3`, `headline`) while copying around as a 4-byte key. Generated
//! ids take the form `<kind>_<n>`. Any id that enters a scene reserves its
//! numeric suffix, so a freshly generated id never repeats one that came in
//! from a loaded layout.

use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

static NAMES: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Next suffix handed out by [`ObjectId::fresh`].
static NEXT_SUFFIX: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(Spur);

impl ObjectId {
    /// The id named `name`. The same name always yields the same id.
    pub fn intern(name: &str) -> Self {
        ObjectId(NAMES.get_or_intern(name))
    }

    /// A new `<kind>_<n>` id whose suffix is above every suffix reserved so
    /// far.
    pub fn fresh(kind: &str) -> Self {
        let n = NEXT_SUFFIX.fetch_add(1, Ordering::Relaxed);
        Self::intern(&format!("{kind}_{n}"))
    }

    pub fn as_str(&self) -> &str {
        NAMES.resolve(&self.0)
    }

    /// Numeric tail after the last `_`, if the id has one.
    pub fn suffix(&self) -> Option<u64> {
        let (_, tail) = self.as_str().rsplit_once('_')?;
        tail.parse().ok()
    }

    /// Keep [`fresh`](Self::fresh) from ever producing this id again.
    pub fn reserve(&self) {
        if let Some(n) = self.suffix().and_then(|n| n.checked_add(1)) {
            NEXT_SUFFIX.fetch_max(n, Ordering::Relaxed);
        }
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(ObjectId::intern(&name))
    }
}
