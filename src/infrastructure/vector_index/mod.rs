mod disk;
mod memory;
mod qdrant;

pub use disk::DiskVectorIndex;
pub use memory::InMemoryVectorIndex;
pub use qdrant::QdrantVectorIndex;
