use std::fmt;
use std::hash::Hash;

/// Output family a set of engines renders into
///
/// `Output` identifies one rendered artifact and keys the location index, so
/// two distinct artifacts of a pass must never compare equal. `Target` is the
/// mutable surface renderers write into.
pub trait Backend: 'static {
    type Output: Clone + Eq + Hash + fmt::Debug;
    type Target;
}
