//! Event names emitted by mobile applications on top of the generic commerce events.

pub const APP_OPENED: &str = "App Opened";
pub const APP_CLOSED: &str = "App Closed";
pub const VIEWED_PROMOTION: &str = "Viewed Promotion";
pub const SELECTED_PROMOTION: &str = "Selected Promotion";

