//! Real-time motion streaming bodies

use super::trajectory::checked_group_count;
use super::{JointArray, MessageBody, MsgType, WireReader, WireWriter, ROS_MAX_JOINT};
use crate::error::FrameError;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealTimeMotionJointStateExData {
    pub groupno: i32,
    pub pos: JointArray,
    pub vel: JointArray,
}

impl RealTimeMotionJointStateExData {
    pub const SIZE: usize = 4 + 2 * 4 * ROS_MAX_JOINT;
}

/// Joint state sampled by the controller once per real-time cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealTimeMotionJointStateEx {
    pub message_id: i32,
    pub mode: i32,
    pub joint_state_data: Vec<RealTimeMotionJointStateExData>,
}

impl RealTimeMotionJointStateEx {
    pub const BASE_SIZE: usize = 12;
}

impl MessageBody for RealTimeMotionJointStateEx {
    const MSG_TYPE: MsgType = MsgType::MotoRealTimeMotionJointStateEx;

    fn encode(&self, w: &mut WireWriter) {
        w.i32(self.message_id);
        w.i32(self.mode);
        w.i32(self.joint_state_data.len() as i32);
        for data in &self.joint_state_data {
            w.i32(data.groupno);
            w.f32_slice(&data.pos);
            w.f32_slice(&data.vel);
        }
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, FrameError> {
        let message_id = r.i32()?;
        let mode = r.i32()?;
        let count = checked_group_count(Self::MSG_TYPE, r.i32()?)?;
        let mut joint_state_data = Vec::with_capacity(count);
        for _ in 0..count {
            joint_state_data.push(RealTimeMotionJointStateExData {
                groupno: r.i32()?,
                pos: r.f32_array()?,
                vel: r.f32_array()?,
            });
        }
        Ok(Self {
            message_id,
            mode,
            joint_state_data,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RealTimeMotionJointCommandExData {
    pub groupno: i32,
    pub command: JointArray,
}

impl RealTimeMotionJointCommandExData {
    pub const SIZE: usize = 4 + 4 * ROS_MAX_JOINT;
}

/// Joint command answering a state sample; `message_id` echoes the sample.
#[derive(Debug, Clone, PartialEq)]
pub struct RealTimeMotionJointCommandEx {
    pub message_id: i32,
    pub joint_command_data: Vec<RealTimeMotionJointCommandExData>,
}

impl RealTimeMotionJointCommandEx {
    pub const BASE_SIZE: usize = 8;
}

impl MessageBody for RealTimeMotionJointCommandEx {
    const MSG_TYPE: MsgType = MsgType::MotoRealTimeMotionJointCommandEx;

    fn encode(&self, w: &mut WireWriter) {
        w.i32(self.message_id);
        w.i32(self.joint_command_data.len() as i32);
        for data in &self.joint_command_data {
            w.i32(data.groupno);
            w.f32_slice(&data.command);
        }
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, FrameError> {
        let message_id = r.i32()?;
        let count = checked_group_count(Self::MSG_TYPE, r.i32()?)?;
        let mut joint_command_data = Vec::with_capacity(count);
        for _ in 0..count {
            joint_command_data.push(RealTimeMotionJointCommandExData {
                groupno: r.i32()?,
                command: r.f32_array()?,
            });
        }
        Ok(Self {
            message_id,
            joint_command_data,
        })
    }
}
