pub mod bridge;
pub mod commands;
pub mod error;
pub mod mailing_list;
pub mod state;
#[cfg(test)]
mod test_support;

pub use bridge::{AnnouncementBridge, RelayReport};
pub use commands::CommandDispatcher;
pub use error::ListError;
pub use mailing_list::MailingList;
pub use state::{AppState, AppStateInner, Settings};
