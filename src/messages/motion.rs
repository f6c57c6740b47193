//! Motion-control requests and replies

use super::{JointArray, MessageBody, MsgType, WireReader, WireWriter, ROS_MAX_JOINT};
use crate::error::FrameError;
use serde::Serialize;

/// Motion-control command codes as published by the controller vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandType {
    CheckMotionReady,
    CheckQueueCount,
    StopMotion,
    StartServos,
    StopServos,
    ResetAlarm,
    StartTrajMode,
    StopTrajMode,
    Disconnect,
    StartRealTimeMotionMode,
    StopRealTimeMotionMode,
}

impl CommandType {
    pub const fn code(self) -> i32 {
        match self {
            CommandType::CheckMotionReady => 200101,
            CommandType::CheckQueueCount => 200102,
            CommandType::StopMotion => 200111,
            CommandType::StartServos => 200112,
            CommandType::StopServos => 200113,
            CommandType::ResetAlarm => 200114,
            CommandType::StartTrajMode => 200121,
            CommandType::StopTrajMode => 200122,
            CommandType::Disconnect => 200130,
            CommandType::StartRealTimeMotionMode => 200140,
            CommandType::StopRealTimeMotionMode => 200141,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            200101 => CommandType::CheckMotionReady,
            200102 => CommandType::CheckQueueCount,
            200111 => CommandType::StopMotion,
            200112 => CommandType::StartServos,
            200113 => CommandType::StopServos,
            200114 => CommandType::ResetAlarm,
            200121 => CommandType::StartTrajMode,
            200122 => CommandType::StopTrajMode,
            200130 => CommandType::Disconnect,
            200140 => CommandType::StartRealTimeMotionMode,
            200141 => CommandType::StopRealTimeMotionMode,
            _ => return None,
        })
    }
}

/// Result field of a motion reply.
///
/// `Success` doubles as "true" and `Failure` as "false" for query commands
/// such as [`CommandType::CheckMotionReady`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultType {
    Success,
    Busy,
    Failure,
    Invalid,
    Alarm,
    NotReady,
    MpFailure,
    Other(i32),
}

impl ResultType {
    pub const fn code(self) -> i32 {
        match self {
            ResultType::Success => 0,
            ResultType::Busy => 1,
            ResultType::Failure => -1,
            ResultType::Invalid => -2,
            ResultType::Alarm => -3,
            ResultType::NotReady => -4,
            ResultType::MpFailure => -5,
            ResultType::Other(code) => code,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            0 => ResultType::Success,
            1 => ResultType::Busy,
            -1 => ResultType::Failure,
            -2 => ResultType::Invalid,
            -3 => ResultType::Alarm,
            -4 => ResultType::NotReady,
            -5 => ResultType::MpFailure,
            other => ResultType::Other(other),
        }
    }
}

/// Detail code accompanying an `Invalid` or `NotReady` result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subcode {
    InvalidUnspecified,
    InvalidMsgSize,
    InvalidMsgHeader,
    InvalidMsgType,
    InvalidGroupNo,
    InvalidSequence,
    InvalidCommand,
    InvalidData,
    InvalidDataStartPos,
    InvalidDataPosition,
    InvalidDataSpeed,
    InvalidDataAccel,
    InvalidDataInsufficient,
    InvalidDataTime,
    InvalidDataToolNo,
    NotReadyUnspecified,
    NotReadyAlarm,
    NotReadyError,
    NotReadyEStop,
    NotReadyNotPlay,
    NotReadyNotRemote,
    NotReadyServoOff,
    NotReadyHold,
    NotReadyNotStarted,
    NotReadyWaitingRos,
    NotReadySkillSend,
    NotReadyPflActive,
    Other(i32),
}

const SUBCODES: &[(i32, Subcode)] = &[
    (3000, Subcode::InvalidUnspecified),
    (3001, Subcode::InvalidMsgSize),
    (3002, Subcode::InvalidMsgHeader),
    (3003, Subcode::InvalidMsgType),
    (3004, Subcode::InvalidGroupNo),
    (3005, Subcode::InvalidSequence),
    (3006, Subcode::InvalidCommand),
    (3010, Subcode::InvalidData),
    (3011, Subcode::InvalidDataStartPos),
    (3012, Subcode::InvalidDataPosition),
    (3013, Subcode::InvalidDataSpeed),
    (3014, Subcode::InvalidDataAccel),
    (3015, Subcode::InvalidDataInsufficient),
    (3016, Subcode::InvalidDataTime),
    (3017, Subcode::InvalidDataToolNo),
    (5000, Subcode::NotReadyUnspecified),
    (5001, Subcode::NotReadyAlarm),
    (5002, Subcode::NotReadyError),
    (5003, Subcode::NotReadyEStop),
    (5004, Subcode::NotReadyNotPlay),
    (5005, Subcode::NotReadyNotRemote),
    (5006, Subcode::NotReadyServoOff),
    (5007, Subcode::NotReadyHold),
    (5008, Subcode::NotReadyNotStarted),
    (5009, Subcode::NotReadyWaitingRos),
    (5010, Subcode::NotReadySkillSend),
    (5011, Subcode::NotReadyPflActive),
];

impl Subcode {
    pub fn from_code(code: i32) -> Self {
        SUBCODES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, subcode)| *subcode)
            .unwrap_or(Subcode::Other(code))
    }

    pub fn code(self) -> i32 {
        match self {
            Subcode::Other(code) => code,
            known => SUBCODES
                .iter()
                .find(|(_, s)| *s == known)
                .map(|(c, _)| *c)
                .unwrap_or_default(),
        }
    }
}

/// Motion-control request addressed to one group (or `-1` for all)
#[derive(Debug, Clone, PartialEq)]
pub struct MotoMotionCtrl {
    pub groupno: i32,
    pub sequence: i32,
    pub command: i32,
    pub data: JointArray,
}

impl MotoMotionCtrl {
    pub const SIZE: usize = 12 + 4 * ROS_MAX_JOINT;

    pub fn new(groupno: i32, sequence: i32, command: CommandType) -> Self {
        Self {
            groupno,
            sequence,
            command: command.code(),
            data: [0.0; ROS_MAX_JOINT],
        }
    }
}

impl MessageBody for MotoMotionCtrl {
    const MSG_TYPE: MsgType = MsgType::MotoMotionCtrl;

    fn encode(&self, w: &mut WireWriter) {
        w.i32(self.groupno);
        w.i32(self.sequence);
        w.i32(self.command);
        w.f32_slice(&self.data);
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, FrameError> {
        Ok(Self {
            groupno: r.i32()?,
            sequence: r.i32()?,
            command: r.i32()?,
            data: r.f32_array()?,
        })
    }
}

/// Controller reply to a motion-control request or trajectory point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MotoMotionReply {
    pub groupno: i32,
    pub sequence: i32,
    pub command: i32,
    pub result: i32,
    pub subcode: i32,
    pub data: JointArray,
}

impl MotoMotionReply {
    pub const SIZE: usize = 20 + 4 * ROS_MAX_JOINT;

    pub fn result_type(&self) -> ResultType {
        ResultType::from_code(self.result)
    }

    pub fn subcode_type(&self) -> Subcode {
        Subcode::from_code(self.subcode)
    }

    pub fn command_type(&self) -> Option<CommandType> {
        CommandType::from_code(self.command)
    }

    pub fn is_success(&self) -> bool {
        self.result_type() == ResultType::Success
    }
}

impl MessageBody for MotoMotionReply {
    const MSG_TYPE: MsgType = MsgType::MotoMotionReply;

    fn encode(&self, w: &mut WireWriter) {
        w.i32(self.groupno);
        w.i32(self.sequence);
        w.i32(self.command);
        w.i32(self.result);
        w.i32(self.subcode);
        w.f32_slice(&self.data);
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, FrameError> {
        Ok(Self {
            groupno: r.i32()?,
            sequence: r.i32()?,
            command: r.i32()?,
            result: r.i32()?,
            subcode: r.i32()?,
            data: r.f32_array()?,
        })
    }
}

/// Tool selection for one group; answered with a [`MotoMotionReply`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotoSelectTool {
    pub groupno: i32,
    pub tool: i32,
    pub sequence: i32,
}

impl MotoSelectTool {
    pub const SIZE: usize = 12;
}

impl MessageBody for MotoSelectTool {
    const MSG_TYPE: MsgType = MsgType::MotoSelectTool;

    fn encode(&self, w: &mut WireWriter) {
        w.i32(self.groupno);
        w.i32(self.tool);
        w.i32(self.sequence);
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, FrameError> {
        Ok(Self {
            groupno: r.i32()?,
            tool: r.i32()?,
            sequence: r.i32()?,
        })
    }
}
