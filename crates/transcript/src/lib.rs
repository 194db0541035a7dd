//! Transcript controller for a study-session chat view.
//!
//! Loads history newest-first in pages, echoes outgoing messages before the
//! backend answers and tells the view where to scroll after each operation.

pub mod compose;
pub mod controller;
pub mod cursor;
pub mod outcome;
pub mod scroll;
pub mod store;

pub use compose::{ComposeKey, Draft, Key};
pub use controller::{Phase, SEND_FAILURE_NOTICE, TranscriptController, greeting};
pub use cursor::{PaginationCursor, page_is_full};
pub use outcome::{Outcome, Status};
pub use scroll::{Operation, ScrollDirective, ScrollPosition};
pub use store::MessageStore;
