//! Message-type registry: discriminant -> (expected body length, decoder)

use super::*;
use crate::error::FrameError;

/// Any body the catalog can carry
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    RobotStatus(RobotStatus),
    JointTrajPtFull(JointTrajPtFull),
    JointFeedback(JointFeedback),
    MotionCtrl(MotoMotionCtrl),
    MotionReply(MotoMotionReply),
    ReadIoBit(MotoReadIoBit),
    ReadIoBitReply(MotoReadIoBitReply),
    WriteIoBit(MotoWriteIoBit),
    WriteIoBitReply(MotoWriteIoBitReply),
    ReadIoGroup(MotoReadIoGroup),
    ReadIoGroupReply(MotoReadIoGroupReply),
    WriteIoGroup(MotoWriteIoGroup),
    WriteIoGroupReply(MotoWriteIoGroupReply),
    IoCtrlReply(MotoIoCtrlReply),
    JointTrajPtFullEx(JointTrajPtFullEx),
    JointFeedbackEx(JointFeedbackEx),
    SelectTool(MotoSelectTool),
    RealTimeJointStateEx(RealTimeMotionJointStateEx),
    RealTimeJointCommandEx(RealTimeMotionJointCommandEx),
}

/// Wires each body type to its `Body` variant.
macro_rules! body_variants {
    ($($ty:ident => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for Body {
                fn from(body: $ty) -> Self {
                    Body::$variant(body)
                }
            }
        )+

        impl Body {
            pub fn msg_type(&self) -> MsgType {
                match self {
                    $(Body::$variant(_) => <$ty as MessageBody>::MSG_TYPE,)+
                }
            }

            pub fn encode(&self, w: &mut WireWriter) {
                match self {
                    $(Body::$variant(body) => body.encode(w),)+
                }
            }
        }
    };
}

body_variants! {
    RobotStatus => RobotStatus,
    JointTrajPtFull => JointTrajPtFull,
    JointFeedback => JointFeedback,
    MotoMotionCtrl => MotionCtrl,
    MotoMotionReply => MotionReply,
    MotoReadIoBit => ReadIoBit,
    MotoReadIoBitReply => ReadIoBitReply,
    MotoWriteIoBit => WriteIoBit,
    MotoWriteIoBitReply => WriteIoBitReply,
    MotoReadIoGroup => ReadIoGroup,
    MotoReadIoGroupReply => ReadIoGroupReply,
    MotoWriteIoGroup => WriteIoGroup,
    MotoWriteIoGroupReply => WriteIoGroupReply,
    MotoIoCtrlReply => IoCtrlReply,
    JointTrajPtFullEx => JointTrajPtFullEx,
    JointFeedbackEx => JointFeedbackEx,
    MotoSelectTool => SelectTool,
    RealTimeMotionJointStateEx => RealTimeJointStateEx,
    RealTimeMotionJointCommandEx => RealTimeJointCommandEx,
}

/// How many body bytes a message type must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyLen {
    Fixed(usize),
    /// `base + n * per_group`, with `n` read as an i32 at `count_offset`.
    PerGroup {
        base: usize,
        per_group: usize,
        count_offset: usize,
    },
}

pub struct BodySpec {
    pub msg_type: MsgType,
    pub len: BodyLen,
    decode: fn(&mut WireReader<'_>) -> Result<Body, FrameError>,
}

impl BodySpec {
    /// Length this body region must have, given its leading bytes.
    pub fn expected_len(&self, bytes: &[u8]) -> Result<usize, FrameError> {
        match self.len {
            BodyLen::Fixed(len) => Ok(len),
            BodyLen::PerGroup {
                base,
                per_group,
                count_offset,
            } => {
                let raw = bytes.get(count_offset..count_offset + 4).ok_or(FrameError::LengthMismatch {
                    msg_type: self.msg_type,
                    expected: base,
                    actual: bytes.len(),
                })?;
                let count = i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
                let groups = trajectory::checked_group_count(self.msg_type, count)?;
                Ok(base + groups * per_group)
            }
        }
    }

    pub fn check_len(&self, bytes: &[u8]) -> Result<(), FrameError> {
        let expected = self.expected_len(bytes)?;
        if expected != bytes.len() {
            return Err(FrameError::LengthMismatch {
                msg_type: self.msg_type,
                expected,
                actual: bytes.len(),
            });
        }
        Ok(())
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Body, FrameError> {
        self.check_len(bytes)?;
        (self.decode)(&mut WireReader::new(bytes))
    }
}

fn decode_as<T: MessageBody + Into<Body>>(r: &mut WireReader<'_>) -> Result<Body, FrameError> {
    T::decode(r).map(Into::into)
}

const fn fixed(msg_type: MsgType, len: usize, decode: fn(&mut WireReader<'_>) -> Result<Body, FrameError>) -> BodySpec {
    BodySpec {
        msg_type,
        len: BodyLen::Fixed(len),
        decode,
    }
}

const fn per_group(
    msg_type: MsgType,
    base: usize,
    per_group: usize,
    count_offset: usize,
    decode: fn(&mut WireReader<'_>) -> Result<Body, FrameError>,
) -> BodySpec {
    BodySpec {
        msg_type,
        len: BodyLen::PerGroup {
            base,
            per_group,
            count_offset,
        },
        decode,
    }
}

static CATALOG: &[BodySpec] = &[
    fixed(MsgType::RobotStatus, RobotStatus::SIZE, decode_as::<RobotStatus>),
    fixed(MsgType::JointTrajPtFull, JointTrajPtFull::SIZE, decode_as::<JointTrajPtFull>),
    fixed(MsgType::JointFeedback, JointFeedback::SIZE, decode_as::<JointFeedback>),
    fixed(MsgType::MotoMotionCtrl, MotoMotionCtrl::SIZE, decode_as::<MotoMotionCtrl>),
    fixed(MsgType::MotoMotionReply, MotoMotionReply::SIZE, decode_as::<MotoMotionReply>),
    fixed(MsgType::MotoReadIoBit, MotoReadIoBit::SIZE, decode_as::<MotoReadIoBit>),
    fixed(MsgType::MotoReadIoBitReply, MotoReadIoBitReply::SIZE, decode_as::<MotoReadIoBitReply>),
    fixed(MsgType::MotoWriteIoBit, MotoWriteIoBit::SIZE, decode_as::<MotoWriteIoBit>),
    fixed(MsgType::MotoWriteIoBitReply, MotoWriteIoBitReply::SIZE, decode_as::<MotoWriteIoBitReply>),
    fixed(MsgType::MotoReadIoGroup, MotoReadIoGroup::SIZE, decode_as::<MotoReadIoGroup>),
    fixed(MsgType::MotoReadIoGroupReply, MotoReadIoGroupReply::SIZE, decode_as::<MotoReadIoGroupReply>),
    fixed(MsgType::MotoWriteIoGroup, MotoWriteIoGroup::SIZE, decode_as::<MotoWriteIoGroup>),
    fixed(MsgType::MotoWriteIoGroupReply, MotoWriteIoGroupReply::SIZE, decode_as::<MotoWriteIoGroupReply>),
    fixed(MsgType::MotoIoCtrlReply, MotoIoCtrlReply::SIZE, decode_as::<MotoIoCtrlReply>),
    per_group(
        MsgType::MotoJointTrajPtFullEx,
        JointTrajPtFullEx::BASE_SIZE,
        JointTrajPtExData::SIZE,
        0,
        decode_as::<JointTrajPtFullEx>,
    ),
    per_group(
        MsgType::MotoJointFeedbackEx,
        JointFeedbackEx::BASE_SIZE,
        JointFeedback::SIZE,
        0,
        decode_as::<JointFeedbackEx>,
    ),
    fixed(MsgType::MotoSelectTool, MotoSelectTool::SIZE, decode_as::<MotoSelectTool>),
    per_group(
        MsgType::MotoRealTimeMotionJointStateEx,
        RealTimeMotionJointStateEx::BASE_SIZE,
        RealTimeMotionJointStateExData::SIZE,
        8,
        decode_as::<RealTimeMotionJointStateEx>,
    ),
    per_group(
        MsgType::MotoRealTimeMotionJointCommandEx,
        RealTimeMotionJointCommandEx::BASE_SIZE,
        RealTimeMotionJointCommandExData::SIZE,
        4,
        decode_as::<RealTimeMotionJointCommandEx>,
    ),
];

pub fn lookup(msg_type: MsgType) -> Option<&'static BodySpec> {
    CATALOG.iter().find(|spec| spec.msg_type == msg_type)
}

/// Decodes a body region using the variant selected by `msg_type`.
pub fn decode_body(msg_type: MsgType, bytes: &[u8]) -> Result<Body, FrameError> {
    lookup(msg_type)
        .ok_or(FrameError::UnknownMessageType(msg_type.code()))?
        .decode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_message_type_is_registered() {
        let all = [
            MsgType::RobotStatus,
            MsgType::JointTrajPtFull,
            MsgType::JointFeedback,
            MsgType::MotoMotionCtrl,
            MsgType::MotoMotionReply,
            MsgType::MotoReadIoBit,
            MsgType::MotoReadIoBitReply,
            MsgType::MotoWriteIoBit,
            MsgType::MotoWriteIoBitReply,
            MsgType::MotoReadIoGroup,
            MsgType::MotoReadIoGroupReply,
            MsgType::MotoWriteIoGroup,
            MsgType::MotoWriteIoGroupReply,
            MsgType::MotoIoCtrlReply,
            MsgType::MotoJointTrajPtFullEx,
            MsgType::MotoJointFeedbackEx,
            MsgType::MotoSelectTool,
            MsgType::MotoRealTimeMotionJointStateEx,
            MsgType::MotoRealTimeMotionJointCommandEx,
        ];
        for msg_type in all {
            assert_eq!(lookup(msg_type).map(|s| s.msg_type), Some(msg_type));
        }
    }

    #[test]
    fn test_fixed_length_mismatch() {
        let err = decode_body(MsgType::MotoMotionReply, &[0u8; 56]).unwrap_err();
        assert_eq!(
            err,
            FrameError::LengthMismatch {
                msg_type: MsgType::MotoMotionReply,
                expected: 60,
                actual: 56
            }
        );
    }

    #[test]
    fn test_per_group_length_uses_count() {
        let mut bytes = 1i32.to_le_bytes().to_vec();
        bytes.resize(JointFeedbackEx::BASE_SIZE + JointFeedback::SIZE - 4, 0);
        let err = decode_body(MsgType::MotoJointFeedbackEx, &bytes).unwrap_err();
        assert!(matches!(err, FrameError::LengthMismatch { expected: 136, .. }));

        bytes.resize(JointFeedbackEx::BASE_SIZE + JointFeedback::SIZE, 0);
        let body = decode_body(MsgType::MotoJointFeedbackEx, &bytes).unwrap();
        assert_eq!(body.msg_type(), MsgType::MotoJointFeedbackEx);
    }

    #[test]
    fn test_decoded_variant_matches_discriminant() {
        let status = RobotStatus {
            drives_powered: 1,
            e_stopped: 0,
            error_code: 0,
            in_error: 0,
            in_motion: 0,
            mode: 1,
            motion_possible: 0,
        };
        let body = decode_body(MsgType::RobotStatus, &status.to_bytes()).unwrap();
        assert_eq!(body, Body::RobotStatus(status));
    }
}
