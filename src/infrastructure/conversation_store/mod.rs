mod memory;
mod redis;

pub use memory::InMemoryConversationStore;
pub use redis::RedisConversationStore;
