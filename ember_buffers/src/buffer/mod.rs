/// Buffer module - GPU buffer resources and their manager
///
/// `BufferManager` owns every `Buffer`; the rest of the engine refers to
/// buffers through `BufferKey` and reads failures through `BufferErrorKind`.

mod bind_slot;
mod buffer;
mod buffer_error;
mod buffer_manager;
mod buffer_type;

pub use bind_slot::*;
pub use buffer::*;
pub use buffer_error::*;
pub use buffer_manager::*;
pub use buffer_type::*;

