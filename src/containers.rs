//! Observable containers.
//!
//! Each container owns one [`Observable`](crate::observable::Observable) and
//! synchronously fires it with a raw [`Change`](crate::observable::Change)
//! after every mutation that altered its content. Borrows of the content are
//! released before notifiers run, so handlers may read or mutate the same
//! container.

mod trait_dict;
mod trait_list;
mod trait_set;

pub use trait_dict::TraitDict;
pub(crate) use trait_dict::DictInner;
pub use trait_list::TraitList;
pub(crate) use trait_list::ListInner;
pub use trait_set::TraitSet;
pub(crate) use trait_set::SetInner;
