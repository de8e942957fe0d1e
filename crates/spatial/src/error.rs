//! Result and Error types for the crate.
use miette::Diagnostic;
use thiserror::Error;

use crate::tree::FrameId;

/// Result containing an error variant from this module.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the frame tree and by frame-tagged values.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// The handle was never issued by this tree.
    #[error("frame {0} is not registered in this tree")]
    #[diagnostic(code(spatial::unknown_frame))]
    UnknownFrame(FrameId),

    /// The frame behind the handle has been removed.
    #[error("frame {0} has been removed from the tree")]
    #[diagnostic(
        code(spatial::stale_frame),
        help("values tagged with a removed frame must be re-created in a live frame")
    )]
    StaleFrameReference(FrameId),

    /// The operation would make a frame its own ancestor.
    #[error("attaching `{frame}` under `{parent}` would create a cycle")]
    #[diagnostic(code(spatial::cycle))]
    Cycle { frame: String, parent: String },

    /// The two frames live in different trees.
    #[error("frames {from} and {to} do not belong to the same tree")]
    #[diagnostic(code(spatial::disjoint_frames))]
    DisjointFrames { from: FrameId, to: FrameId },

    /// A binary operation was attempted on values expressed in different frames.
    #[error("value in frame {left} cannot be combined with a value in frame {right}")]
    #[diagnostic(
        code(spatial::frame_mismatch),
        help("convert one of the operands with `expressed_in` before combining them")
    )]
    FrameMismatch { left: FrameId, right: FrameId },

    /// Frame names are unique within a tree.
    #[error("a frame named `{0}` already exists")]
    #[diagnostic(code(spatial::duplicate_frame_name))]
    DuplicateFrameName(String),

    /// The world frame is fixed.
    #[error("the world frame cannot be {0}")]
    #[diagnostic(code(spatial::root_frame))]
    RootFrame(&'static str),

    /// A planar value was expressed through a transform that tilts the XY plane.
    #[error("transform from {from} to {to} does not keep the XY plane")]
    #[diagnostic(
        code(spatial::non_planar_transform),
        help("only rotations about the Z axis can carry 2D values between frames")
    )]
    NonPlanarTransform { from: FrameId, to: FrameId },

    /// A shape query failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Shape(#[from] shape::Error),

    /// IO error, this wraps a [`std::io::Error`]
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Deserialize error, this wraps a [`toml::de::Error`]
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),
}
