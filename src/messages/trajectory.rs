//! Joint trajectory points, single-group and multi-group

use super::{JointArray, MessageBody, MsgType, WireReader, WireWriter, MAX_CONTROLLABLE_GROUPS, ROS_MAX_JOINT};
use crate::error::FrameError;
use serde::Serialize;
use std::ops::{BitOr, BitOrAssign};

/// Presence flags for the optional parts of a trajectory point or feedback
/// record. Fields whose bit is clear carry no meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct ValidFields(pub i32);

impl ValidFields {
    pub const NONE: ValidFields = ValidFields(0);
    pub const TIME: ValidFields = ValidFields(0x1);
    pub const POSITION: ValidFields = ValidFields(0x2);
    pub const VELOCITY: ValidFields = ValidFields(0x4);
    pub const ACCELERATION: ValidFields = ValidFields(0x8);

    pub const fn bits(self) -> i32 {
        self.0
    }

    pub const fn contains(self, other: ValidFields) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ValidFields {
    type Output = ValidFields;

    fn bitor(self, rhs: ValidFields) -> ValidFields {
        ValidFields(self.0 | rhs.0)
    }
}

impl BitOrAssign for ValidFields {
    fn bitor_assign(&mut self, rhs: ValidFields) {
        self.0 |= rhs.0;
    }
}

/// Single-group trajectory point
#[derive(Debug, Clone, PartialEq)]
pub struct JointTrajPtFull {
    pub groupno: i32,
    pub sequence: i32,
    pub valid_fields: ValidFields,
    pub time: f32,
    pub pos: JointArray,
    pub vel: JointArray,
    pub acc: JointArray,
}

impl JointTrajPtFull {
    pub const SIZE: usize = 16 + 3 * 4 * ROS_MAX_JOINT;
}

impl MessageBody for JointTrajPtFull {
    const MSG_TYPE: MsgType = MsgType::JointTrajPtFull;

    fn encode(&self, w: &mut WireWriter) {
        w.i32(self.groupno);
        w.i32(self.sequence);
        w.i32(self.valid_fields.bits());
        w.f32(self.time);
        w.f32_slice(&self.pos);
        w.f32_slice(&self.vel);
        w.f32_slice(&self.acc);
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, FrameError> {
        Ok(Self {
            groupno: r.i32()?,
            sequence: r.i32()?,
            valid_fields: ValidFields(r.i32()?),
            time: r.f32()?,
            pos: r.f32_array()?,
            vel: r.f32_array()?,
            acc: r.f32_array()?,
        })
    }
}

/// Per-group entry of a [`JointTrajPtFullEx`]
#[derive(Debug, Clone, PartialEq)]
pub struct JointTrajPtExData {
    pub groupno: i32,
    pub valid_fields: ValidFields,
    pub time: f32,
    pub pos: JointArray,
    pub vel: JointArray,
    pub acc: JointArray,
}

impl JointTrajPtExData {
    pub const SIZE: usize = 12 + 3 * 4 * ROS_MAX_JOINT;

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

/// Multi-group trajectory point. The group count on the wire is the length
/// of `joint_traj_pt_data`.
#[derive(Debug, Clone, PartialEq)]
pub struct JointTrajPtFullEx {
    pub sequence: i32,
    pub joint_traj_pt_data: Vec<JointTrajPtExData>,
}

impl JointTrajPtFullEx {
    pub const BASE_SIZE: usize = 8;

    pub fn number_of_valid_groups(&self) -> usize {
        self.joint_traj_pt_data.len()
    }
}

impl MessageBody for JointTrajPtFullEx {
    const MSG_TYPE: MsgType = MsgType::MotoJointTrajPtFullEx;

    fn encode(&self, w: &mut WireWriter) {
        w.i32(self.joint_traj_pt_data.len() as i32);
        w.i32(self.sequence);
        for data in &self.joint_traj_pt_data {
            data.encode(w);
        }
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, FrameError> {
        let count = r.i32()?;
        let sequence = r.i32()?;
        let count = checked_group_count(Self::MSG_TYPE, count)?;
        let joint_traj_pt_data = (0..count)
            .map(|_| JointTrajPtExData::decode(r))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            sequence,
            joint_traj_pt_data,
        })
    }
}

/// Validates an in-band group count against the controller's group limit.
pub(crate) fn checked_group_count(msg_type: MsgType, count: i32) -> Result<usize, FrameError> {
    usize::try_from(count)
        .ok()
        .filter(|&n| n <= MAX_CONTROLLABLE_GROUPS)
        .ok_or(FrameError::GroupCount { msg_type, count })
}
