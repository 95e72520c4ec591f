pub mod modern;
pub mod modern_helpers;
pub mod pipe;
pub mod styles;
pub mod util;

// Re-export so callers can use `crate::ui::track_id(...)`.
pub use util::track_id;
