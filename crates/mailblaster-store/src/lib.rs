pub mod locks;
pub mod reaper;
pub mod store;
pub mod subscribers;

pub use locks::GuildLocks;
pub use reaper::{GuildReaper, ReapReport};
pub use store::GuildStore;
