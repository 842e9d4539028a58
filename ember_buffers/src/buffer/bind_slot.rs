/// Binding slots of a rendering pass

use crate::device::BufferUsageFlags;

/// Kind of input a slot expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Vertex,
    Index,
    Uniform,
    Storage,
    TransferSrc,
    TransferDst,
}

impl SlotKind {
    /// Usage a buffer needs to be bound to this kind of slot
    pub fn required_usage(&self) -> BufferUsageFlags {
        match self {
            SlotKind::Vertex => BufferUsageFlags::VERTEX,
            SlotKind::Index => BufferUsageFlags::INDEX,
            SlotKind::Uniform => BufferUsageFlags::UNIFORM,
            SlotKind::Storage => BufferUsageFlags::STORAGE,
            SlotKind::TransferSrc => BufferUsageFlags::TRANSFER_SRC,
            SlotKind::TransferDst => BufferUsageFlags::TRANSFER_DST,
        }
    }
}

/// A numbered binding point (e.g. uniform slot 0, vertex slot 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindSlot {
    pub kind: SlotKind,
    pub index: u32,
}

impl BindSlot {
    pub const VERTEX_0: BindSlot = BindSlot::new(SlotKind::Vertex, 0);
    pub const INDEX_0: BindSlot = BindSlot::new(SlotKind::Index, 0);
    pub const UNIFORM_0: BindSlot = BindSlot::new(SlotKind::Uniform, 0);
    pub const STORAGE_0: BindSlot = BindSlot::new(SlotKind::Storage, 0);

    pub const fn new(kind: SlotKind, index: u32) -> Self {
        Self { kind, index }
    }

    /// Whether a buffer created with `usage` may be bound here
    pub fn accepts(&self, usage: BufferUsageFlags) -> bool {
        usage.contains(self.kind.required_usage())
    }
}
