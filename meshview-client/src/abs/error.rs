//! Errors raised by the GPU layer.

use super::device::ShaderStage;

/// An error from creating, updating or drawing GPU resources.
#[derive(Debug, thiserror::Error)]
pub enum GlError {
    /// Windowing or context creation failed.
    #[error("initialization failed: {0}")]
    Init(String),
    #[error("{stage} shader failed to compile:\n{log}")]
    ShaderCompile { stage: ShaderStage, log: String },
    #[error("program failed to link:\n{0}")]
    ProgramLink(String),
    #[error("cannot allocate {what}: {reason}")]
    Allocation { what: &'static str, reason: String },
    /// An in-place update was asked to change the shape of a resource.
    #[error("cannot update {what} in place: {reason}")]
    Incompatible { what: &'static str, reason: String },
    #[error("{0} is not allocated")]
    Unallocated(&'static str),
    #[error("{0} is not supported")]
    Unsupported(&'static str),
    #[error("framebuffer incomplete (status {0:#x})")]
    FramebufferIncomplete(u32),
}

impl GlError {
    pub(crate) fn allocation(what: &'static str, reason: impl Into<String>) -> Self {
        Self::Allocation {
            what,
            reason: reason.into(),
        }
    }

    pub(crate) fn incompatible(what: &'static str, reason: impl Into<String>) -> Self {
        Self::Incompatible {
            what,
            reason: reason.into(),
        }
    }
}
