// Notification channels for newly seen showings.

pub mod console;
pub mod pushover;
pub mod traits;

pub use console::ConsoleNotifier;
pub use pushover::PushoverNotifier;
pub use traits::Notifier;
