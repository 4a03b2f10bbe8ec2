// Service exports
pub mod cache;
pub mod queue;
pub mod roster_source;

pub use cache::{
    get_json, set_json, CacheError, CacheKey, CacheManager, LogStatsSink, MemoryCache, RosterCache,
    StatsSink,
};
pub use queue::{ChannelPublisher, LogPublisher, MatchQueue, QueueError, QueueReply, QueueWorker, ResponsePublisher};
pub use roster_source::{HttpRosterSource, RosterSource, RosterSourceError};
