//! Simple Message catalog
//!
//! Every body has a fixed little-endian layout and a message-type
//! discriminant carried in the header. Bodies whose size depends on the
//! number of control groups ("Ex" messages) carry that count in-band.
//!
//! | Type | Body | Bytes |
//! |------|------|-------|
//! | 14   | [`JointTrajPtFull`] | 136 |
//! | 15   | [`JointFeedback`] | 132 |
//! | 13   | [`RobotStatus`] | 28 |
//! | 2001 | [`MotoMotionCtrl`] | 52 |
//! | 2002 | [`MotoMotionReply`] | 60 |
//! | 2003-2011 | I/O requests and replies | 4-8 |
//! | 2016 | [`JointTrajPtFullEx`] | 8 + 132n |
//! | 2017 | [`JointFeedbackEx`] | 4 + 132n |
//! | 2018 | [`MotoSelectTool`] | 12 |
//! | 2030 | [`RealTimeMotionJointStateEx`] | 12 + 84n |
//! | 2031 | [`RealTimeMotionJointCommandEx`] | 8 + 44n |

pub mod catalog;
pub mod io;
pub mod motion;
pub mod realtime;
pub mod state;
pub mod trajectory;
pub mod wire;

pub use catalog::{decode_body, lookup, Body, BodyLen, BodySpec};
pub use io::{
    MotoIoCtrlReply, MotoReadIoBit, MotoReadIoBitReply, MotoReadIoGroup, MotoReadIoGroupReply,
    MotoWriteIoBit, MotoWriteIoBitReply, MotoWriteIoGroup, MotoWriteIoGroupReply,
};
pub use motion::{CommandType, MotoMotionCtrl, MotoMotionReply, MotoSelectTool, ResultType, Subcode};
pub use realtime::{
    RealTimeMotionJointCommandEx, RealTimeMotionJointCommandExData, RealTimeMotionJointStateEx,
    RealTimeMotionJointStateExData,
};
pub use state::{JointFeedback, JointFeedbackEx, RobotMode, RobotStatus, TriState};
pub use trajectory::{JointTrajPtExData, JointTrajPtFull, JointTrajPtFullEx, ValidFields};
pub use wire::{WireReader, WireWriter};

use crate::error::FrameError;

/// Capacity of every per-message joint array.
pub const ROS_MAX_JOINT: usize = 10;

/// Upper bound on control groups addressed by one controller.
pub const MAX_CONTROLLABLE_GROUPS: usize = 4;

/// Fixed-capacity joint array as carried on the wire.
pub type JointArray = [f32; ROS_MAX_JOINT];

/// Defines a closed enum over published i32 codes with a fallible decoder.
macro_rules! wire_code {
    (
        $(#[$meta:meta])*
        pub enum $name:ident => $err:ident {
            $($(#[$vmeta:meta])* $variant:ident = $code:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            pub const fn code(self) -> i32 {
                match self {
                    $($name::$variant => $code,)+
                }
            }
        }

        impl TryFrom<i32> for $name {
            type Error = FrameError;

            fn try_from(code: i32) -> Result<Self, FrameError> {
                match code {
                    $($code => Ok($name::$variant),)+
                    other => Err(FrameError::$err(other)),
                }
            }
        }
    };
}

wire_code! {
    /// Message-type discriminant carried in every header
    pub enum MsgType => UnknownMessageType {
        RobotStatus = 13,
        JointTrajPtFull = 14,
        JointFeedback = 15,
        MotoMotionCtrl = 2001,
        MotoMotionReply = 2002,
        MotoReadIoBit = 2003,
        MotoReadIoBitReply = 2004,
        MotoWriteIoBit = 2005,
        MotoWriteIoBitReply = 2006,
        MotoReadIoGroup = 2007,
        MotoReadIoGroupReply = 2008,
        MotoWriteIoGroup = 2009,
        MotoWriteIoGroupReply = 2010,
        MotoIoCtrlReply = 2011,
        MotoJointTrajPtFullEx = 2016,
        MotoJointFeedbackEx = 2017,
        MotoSelectTool = 2018,
        MotoRealTimeMotionJointStateEx = 2030,
        MotoRealTimeMotionJointCommandEx = 2031,
    }
}

wire_code! {
    /// One-way topic vs. request/reply service
    pub enum CommType => UnknownCommType {
        Invalid = 0,
        Topic = 1,
        ServiceRequest = 2,
        ServiceReply = 3,
    }
}

wire_code! {
    /// Success/failure class of a service reply
    pub enum ReplyType => UnknownReplyType {
        Invalid = 0,
        Success = 1,
        Failure = 2,
    }
}

/// A fixed-layout body with a stable discriminant.
pub trait MessageBody: Sized {
    const MSG_TYPE: MsgType;

    fn encode(&self, w: &mut WireWriter);

    fn decode(r: &mut WireReader<'_>) -> Result<Self, FrameError>;

    fn to_bytes(&self) -> Vec<u8> {
        let mut w = WireWriter::new();
        self.encode(&mut w);
        w.into_inner()
    }

    /// Decodes a body region, validating its length against the catalog.
    fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        let spec = lookup(Self::MSG_TYPE).ok_or(FrameError::UnknownMessageType(Self::MSG_TYPE.code()))?;
        spec.check_len(bytes)?;
        Self::decode(&mut WireReader::new(bytes))
    }
}

/// Copies the first `values.len()` joints into a zero-filled wire array.
pub fn joint_array(values: &[f32]) -> JointArray {
    let mut out = [0.0; ROS_MAX_JOINT];
    for (slot, &value) in out.iter_mut().zip(values) {
        *slot = value;
    }
    out
}
