/// Buffer kinds and their usage lookup table

use crate::device::{BufferUsageFlags, MemoryLocation};
use crate::buffer::{BufferError, BufferErrorKind};

/// Role a buffer plays in the pipeline
///
/// Staging variants are host-visible shadows of a device-local kind. The
/// pairing lives in the lookup table below, not in the buffer itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum BufferType {
    Vertex = 0,
    Index = 1,
    VertexStaging = 2,
    IndexStaging = 3,
    Uniform = 4,
    Generic = 5,
    GenericStaging = 6,
    Storage = 7,
}

/// Static usage metadata of a buffer kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferTypeInfo {
    /// Usage flags the device object is created with
    pub usage: BufferUsageFlags,
    /// Memory location the object is backed by
    pub location: MemoryLocation,
    /// Host-visible kind used to upload into this one, if it is device-local
    pub staging: Option<BufferType>,
    /// Name prefix of transient staging buffers built for this kind
    pub staging_prefix: &'static str,
}

impl BufferType {
    /// Every kind, in discriminant order
    pub const ALL: [BufferType; 8] = [
        BufferType::Vertex,
        BufferType::Index,
        BufferType::VertexStaging,
        BufferType::IndexStaging,
        BufferType::Uniform,
        BufferType::Generic,
        BufferType::GenericStaging,
        BufferType::Storage,
    ];

    /// Usage metadata for this kind
    pub fn info(&self) -> BufferTypeInfo {
        use crate::device::BufferUsageFlags as U;
        match self {
            BufferType::Vertex => BufferTypeInfo {
                usage: U::VERTEX | U::TRANSFER_DST,
                location: MemoryLocation::GpuOnly,
                staging: Some(BufferType::VertexStaging),
                staging_prefix: "v_staging_",
            },
            BufferType::Index => BufferTypeInfo {
                usage: U::INDEX | U::TRANSFER_DST,
                location: MemoryLocation::GpuOnly,
                staging: Some(BufferType::IndexStaging),
                staging_prefix: "i_staging_",
            },
            BufferType::Generic => BufferTypeInfo {
                usage: U::VERTEX | U::INDEX | U::STORAGE | U::TRANSFER_SRC | U::TRANSFER_DST,
                location: MemoryLocation::GpuOnly,
                staging: Some(BufferType::GenericStaging),
                staging_prefix: "g_staging_",
            },
            BufferType::VertexStaging | BufferType::IndexStaging => BufferTypeInfo {
                usage: U::TRANSFER_SRC,
                location: MemoryLocation::CpuToGpu,
                staging: None,
                staging_prefix: "",
            },
            BufferType::GenericStaging => BufferTypeInfo {
                usage: U::TRANSFER_SRC | U::TRANSFER_DST,
                location: MemoryLocation::CpuToGpu,
                staging: None,
                staging_prefix: "",
            },
            BufferType::Uniform => BufferTypeInfo {
                usage: U::UNIFORM,
                location: MemoryLocation::CpuToGpu,
                staging: None,
                staging_prefix: "",
            },
            BufferType::Storage => BufferTypeInfo {
                usage: U::STORAGE,
                location: MemoryLocation::CpuToGpu,
                staging: None,
                staging_prefix: "",
            },
        }
    }

    /// Usage flags of this kind
    pub fn usage(&self) -> BufferUsageFlags {
        self.info().usage
    }

    /// Whether the host can write this kind directly
    pub fn is_host_visible(&self) -> bool {
        self.info().location.is_host_visible()
    }

    /// Whether this is one of the `*Staging` kinds
    pub fn is_staging(&self) -> bool {
        matches!(
            self,
            BufferType::VertexStaging | BufferType::IndexStaging | BufferType::GenericStaging
        )
    }

    /// Staging kind that feeds this device-local kind
    pub fn staging_counterpart(&self) -> Option<BufferType> {
        self.info().staging
    }

    /// Device-local kind a staging kind feeds
    pub fn device_local_counterpart(&self) -> Option<BufferType> {
        match self {
            BufferType::VertexStaging => Some(BufferType::Vertex),
            BufferType::IndexStaging => Some(BufferType::Index),
            BufferType::GenericStaging => Some(BufferType::Generic),
            _ => None,
        }
    }
}

impl TryFrom<u32> for BufferType {
    type Error = BufferError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        BufferType::ALL
            .get(raw as usize)
            .copied()
            .ok_or_else(|| BufferError::new(
                BufferErrorKind::Type,
                format!("Unrecognized buffer type {}", raw),
            ))
    }
}

impl From<BufferType> for u32 {
    fn from(kind: BufferType) -> Self {
        kind as u32
    }
}

#[cfg(test)]
#[path = "buffer_type_tests.rs"]
mod tests;
