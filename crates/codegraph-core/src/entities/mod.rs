//! Entity structs for the data model.

mod chunk;
mod edge;
mod memory;
mod node;
mod stream;
mod upload_session;

pub use chunk::{Chunk, ChunkMetadata, ReExport};
pub use edge::{Edge, EdgeProperties};
pub use memory::MemoryRecord;
pub use node::{Node, NodeProperties};
pub use stream::StreamMessage;
pub use upload_session::{StageCounters, UploadSession};
