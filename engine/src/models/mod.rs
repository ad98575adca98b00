// Engine-internal data structures that are not meant for sharing.
pub mod history;

pub use history::VolumeHistoryRecord;
