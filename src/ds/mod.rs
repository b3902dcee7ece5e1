pub mod recency_index;

pub use recency_index::{Iter, RecencyIndex, SlotId};
