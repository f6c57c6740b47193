//! Telemetry pushed by the controller on the state connection

use super::trajectory::checked_group_count;
use super::{JointArray, MessageBody, MsgType, ValidFields, WireReader, WireWriter, ROS_MAX_JOINT};
use crate::error::FrameError;
use serde::Serialize;

/// Joint state of one control group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JointFeedback {
    pub groupno: i32,
    pub valid_fields: ValidFields,
    pub time: f32,
    pub pos: JointArray,
    pub vel: JointArray,
    pub acc: JointArray,
}

impl JointFeedback {
    pub const SIZE: usize = 12 + 3 * 4 * ROS_MAX_JOINT;
}

impl MessageBody for JointFeedback {
    const MSG_TYPE: MsgType = MsgType::JointFeedback;

    fn encode(&self, w: &mut WireWriter) {
        w.i32(self.groupno);
        w.i32(self.valid_fields.bits());
        w.f32(self.time);
        w.f32_slice(&self.pos);
        w.f32_slice(&self.vel);
        w.f32_slice(&self.acc);
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, FrameError> {
        Ok(Self {
            groupno: r.i32()?,
            valid_fields: ValidFields(r.i32()?),
            time: r.f32()?,
            pos: r.f32_array()?,
            vel: r.f32_array()?,
            acc: r.f32_array()?,
        })
    }
}

/// Joint state of every configured group in one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JointFeedbackEx {
    pub joint_feedback_data: Vec<JointFeedback>,
}

impl JointFeedbackEx {
    pub const BASE_SIZE: usize = 4;

    pub fn number_of_valid_groups(&self) -> usize {
        self.joint_feedback_data.len()
    }

    pub fn group(&self, groupno: i32) -> Option<&JointFeedback> {
        self.joint_feedback_data.iter().find(|fb| fb.groupno == groupno)
    }
}

impl MessageBody for JointFeedbackEx {
    const MSG_TYPE: MsgType = MsgType::MotoJointFeedbackEx;

    fn encode(&self, w: &mut WireWriter) {
        w.i32(self.joint_feedback_data.len() as i32);
        for feedback in &self.joint_feedback_data {
            feedback.encode(w);
        }
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, FrameError> {
        let count = checked_group_count(Self::MSG_TYPE, r.i32()?)?;
        let joint_feedback_data = (0..count)
            .map(|_| JointFeedback::decode(r))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { joint_feedback_data })
    }
}

/// Interpretation of the controller's `-1 / 0 / 1` status fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriState {
    Unknown,
    False,
    True,
}

impl TriState {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => TriState::False,
            1 => TriState::True,
            _ => TriState::Unknown,
        }
    }

    pub fn is_true(self) -> bool {
        self == TriState::True
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RobotMode {
    Unknown,
    Manual,
    Auto,
}

impl RobotMode {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => RobotMode::Manual,
            2 => RobotMode::Auto,
            _ => RobotMode::Unknown,
        }
    }
}

/// Controller-wide status. Fields keep the raw wire codes; the accessor
/// methods interpret them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RobotStatus {
    pub drives_powered: i32,
    pub e_stopped: i32,
    pub error_code: i32,
    pub in_error: i32,
    pub in_motion: i32,
    pub mode: i32,
    pub motion_possible: i32,
}

impl RobotStatus {
    pub const SIZE: usize = 28;

    pub fn drives_powered(&self) -> TriState {
        TriState::from_code(self.drives_powered)
    }

    pub fn e_stopped(&self) -> TriState {
        TriState::from_code(self.e_stopped)
    }

    pub fn in_error(&self) -> TriState {
        TriState::from_code(self.in_error)
    }

    pub fn in_motion(&self) -> TriState {
        TriState::from_code(self.in_motion)
    }

    pub fn mode(&self) -> RobotMode {
        RobotMode::from_code(self.mode)
    }

    pub fn motion_possible(&self) -> TriState {
        TriState::from_code(self.motion_possible)
    }
}

impl MessageBody for RobotStatus {
    const MSG_TYPE: MsgType = MsgType::RobotStatus;

    fn encode(&self, w: &mut WireWriter) {
        w.i32(self.drives_powered);
        w.i32(self.e_stopped);
        w.i32(self.error_code);
        w.i32(self.in_error);
        w.i32(self.in_motion);
        w.i32(self.mode);
        w.i32(self.motion_possible);
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, FrameError> {
        Ok(Self {
            drives_powered: r.i32()?,
            e_stopped: r.i32()?,
            error_code: r.i32()?,
            in_error: r.i32()?,
            in_motion: r.i32()?,
            mode: r.i32()?,
            motion_possible: r.i32()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_robot_status_accessors() {
        let status = RobotStatus {
            drives_powered: 1,
            e_stopped: 0,
            error_code: 0,
            in_error: 0,
            in_motion: -1,
            mode: 2,
            motion_possible: 1,
        };
        let bytes = status.to_bytes();
        assert_eq!(bytes.len(), RobotStatus::SIZE);
        let decoded = RobotStatus::from_bytes(&bytes).unwrap();
        assert!(decoded.drives_powered().is_true());
        assert_eq!(decoded.e_stopped(), TriState::False);
        assert_eq!(decoded.in_motion(), TriState::Unknown);
        assert_eq!(decoded.mode(), RobotMode::Auto);
        assert!(decoded.motion_possible().is_true());
    }

    #[test]
    fn test_feedback_ex_lookup_by_group() {
        let feedback = |groupno| JointFeedback {
            groupno,
            valid_fields: ValidFields::TIME | ValidFields::POSITION,
            time: 2.0,
            pos: [groupno as f32; ROS_MAX_JOINT],
            vel: [0.0; ROS_MAX_JOINT],
            acc: [0.0; ROS_MAX_JOINT],
        };
        let ex = JointFeedbackEx {
            joint_feedback_data: vec![feedback(0), feedback(1)],
        };
        let bytes = ex.to_bytes();
        assert_eq!(bytes.len(), JointFeedbackEx::BASE_SIZE + 2 * JointFeedback::SIZE);
        let decoded = JointFeedbackEx::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.number_of_valid_groups(), 2);
        assert_eq!(decoded.group(1).unwrap().pos[0], 1.0);
        assert!(decoded.group(3).is_none());
    }
}
