//! Frame graph error types.

use crate::backend::BackendError;
use thiserror::Error;

/// Errors raised while declaring, compiling or executing a frame.
///
/// Any of these aborts the current frame; the orchestrator decides whether to skip
/// or retry. Backend failures pass through unchanged as [`FrameGraphError::Backend`].
#[derive(Error, Debug)]
pub enum FrameGraphError {
    #[error("stale texture handle #{index} from frame {handle_frame} (current frame {current_frame})")]
    StaleHandle {
        index: u32,
        handle_frame: u32,
        current_frame: u32,
    },
    #[error("pass '{pass}' accessed {resource} without declaring it")]
    UndeclaredAccess { pass: String, resource: String },
    #[error("pass '{pass}' modified global shader state without allowing it")]
    UndeclaredGlobalState { pass: String },
    #[error("pass '{pass}' reads texture '{texture}' which no pass writes this frame")]
    UnwrittenRead { pass: String, texture: String },
    #[error("pass '{pass}' writes texture '{texture}' already written by '{first_writer}'")]
    DuplicateWrite {
        pass: String,
        texture: String,
        first_writer: String,
    },
    #[error("pass '{pass}' binds texture '{texture}' as an attachment without write access")]
    ReadOnlyAttachment { pass: String, texture: String },
    #[error("pass '{pass}' binds two attachments to {slot}")]
    AttachmentSlotInUse { pass: String, slot: String },
    #[error("pass '{pass}' has no render function")]
    MissingRenderFunc { pass: String },
    #[error("pass '{pass}' set its render function twice")]
    DuplicateRenderFunc { pass: String },
    #[error("pass '{pass}' was declared before setup() bound its inputs")]
    PassNotSetUp { pass: String },
    #[error("invalid texture descriptor '{label}': {reason}")]
    InvalidDescriptor { label: String, reason: String },
    #[error("render graph contains a cyclic dependency")]
    CyclicDependency,
    #[error("compiled graph belongs to frame {compiled_frame}, graph is at frame {current_frame}")]
    StaleCompilation {
        compiled_frame: u32,
        current_frame: u32,
    },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub type FrameGraphResult<T> = Result<T, FrameGraphError>;
