//! Named control groups (robot arm, positioner, ...) and their joint views

use crate::error::{MotoError, Result};
use crate::io_connection::IoConnection;
use crate::messages::{JointFeedback, JointTrajPtFull, MotoMotionReply, MAX_CONTROLLABLE_GROUPS, ROS_MAX_JOINT};
use crate::motion_connection::{MotionConnection, NO_SEQUENCE};
use crate::state_connection::StateConnection;
use crate::transport::{TcpTransport, Transport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Static description of one control group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlGroupDefinition {
    pub groupid: String,
    pub groupno: i32,
    pub num_joints: usize,
}

impl ControlGroupDefinition {
    pub fn new(groupid: impl Into<String>, groupno: i32, num_joints: usize) -> Result<Self> {
        let definition = Self {
            groupid: groupid.into(),
            groupno,
            num_joints,
        };
        definition.validate()?;
        Ok(definition)
    }

    pub fn validate(&self) -> Result<()> {
        if self.groupid.is_empty() {
            return Err(MotoError::InvalidArgument("control group id is empty".to_string()));
        }
        if !(0..MAX_CONTROLLABLE_GROUPS as i32).contains(&self.groupno) {
            return Err(MotoError::InvalidArgument(format!(
                "group {}: groupno {} outside 0..{}",
                self.groupid, self.groupno, MAX_CONTROLLABLE_GROUPS
            )));
        }
        if self.num_joints == 0 || self.num_joints > ROS_MAX_JOINT {
            return Err(MotoError::InvalidArgument(format!(
                "group {}: num_joints {} outside 1..={}",
                self.groupid, self.num_joints, ROS_MAX_JOINT
            )));
        }
        Ok(())
    }
}

/// A control group bound to the session's shared connections.
pub struct ControlGroup<T: Transport + 'static = TcpTransport> {
    definition: ControlGroupDefinition,
    motion: Arc<MotionConnection<T>>,
    state: Arc<StateConnection<T>>,
    io: Arc<IoConnection<T>>,
}

impl<T: Transport + 'static> ControlGroup<T> {
    /// Binds a group to the connections. Rejects definitions that would
    /// address a group or joint outside the wire arrays.
    pub fn new(
        definition: ControlGroupDefinition,
        motion: Arc<MotionConnection<T>>,
        state: Arc<StateConnection<T>>,
        io: Arc<IoConnection<T>>,
    ) -> Result<Self> {
        definition.validate()?;
        Ok(Self {
            definition,
            motion,
            state,
            io,
        })
    }

    pub fn groupid(&self) -> &str {
        &self.definition.groupid
    }

    pub fn groupno(&self) -> i32 {
        self.definition.groupno
    }

    pub fn num_joints(&self) -> usize {
        self.definition.num_joints
    }

    pub fn definition(&self) -> &ControlGroupDefinition {
        &self.definition
    }

    pub fn io(&self) -> &IoConnection<T> {
        &self.io
    }

    /// Latest feedback for this group; `None` until the state connection
    /// has delivered one.
    pub fn joint_feedback(&self) -> Option<JointFeedback> {
        self.state.joint_feedback(self.groupno())
    }

    fn joints(&self, pick: fn(&JointFeedback) -> &[f32]) -> Option<Vec<f32>> {
        self.joint_feedback()
            .map(|feedback| pick(&feedback)[..self.num_joints()].to_vec())
    }

    pub fn position(&self) -> Option<Vec<f32>> {
        self.joints(|feedback| &feedback.pos[..])
    }

    pub fn velocity(&self) -> Option<Vec<f32>> {
        self.joints(|feedback| &feedback.vel[..])
    }

    pub fn acceleration(&self) -> Option<Vec<f32>> {
        self.joints(|feedback| &feedback.acc[..])
    }

    pub fn check_queue_count(&self) -> Result<MotoMotionReply> {
        self.motion.check_queue_count(self.groupno(), NO_SEQUENCE)
    }

    /// Sends a single-group point addressed to this group, whatever
    /// `groupno` the caller filled in.
    pub fn send_joint_traj_pt_full(&self, mut point: JointTrajPtFull) -> Result<MotoMotionReply> {
        point.groupno = self.groupno();
        self.motion.send_joint_trajectory_point(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{self, Header};
    use crate::messages::{
        Body, CommType, MotoMotionReply, MsgType, ReplyType, ResultType, ValidFields,
    };
    use crate::transport::mock::MockTransport;

    fn group_over(
        definition: ControlGroupDefinition,
        motion: MockTransport,
        state: MockTransport,
    ) -> ControlGroup<MockTransport> {
        ControlGroup::new(
            definition,
            Arc::new(MotionConnection::with_transport(motion)),
            Arc::new(StateConnection::with_transport(state)),
            Arc::new(IoConnection::with_transport(MockTransport::new())),
        )
        .unwrap()
    }

    fn feedback_frame(groupno: i32) -> Vec<u8> {
        let mut vel = [0.0; ROS_MAX_JOINT];
        for (i, v) in vel.iter_mut().enumerate() {
            *v = i as f32;
        }
        let body: Body = JointFeedback {
            groupno,
            valid_fields: ValidFields::POSITION | ValidFields::VELOCITY,
            time: 0.0,
            pos: [1.0; ROS_MAX_JOINT],
            vel,
            acc: [0.0; ROS_MAX_JOINT],
        }
        .into();
        codec::encode(&Header::topic(body.msg_type()), &body)
    }

    #[test]
    fn test_definition_bounds() {
        assert!(ControlGroupDefinition::new("R1", 0, 6).is_ok());
        assert!(ControlGroupDefinition::new("R1", 4, 6).is_err());
        assert!(ControlGroupDefinition::new("R1", -1, 6).is_err());
        assert!(ControlGroupDefinition::new("R1", 0, 11).is_err());
        assert!(ControlGroupDefinition::new("", 0, 6).is_err());
    }

    #[test]
    fn test_group_rejects_hand_built_oversized_definition() {
        let definition = ControlGroupDefinition {
            groupid: "R1".to_string(),
            groupno: 0,
            num_joints: 12,
        };
        let group = ControlGroup::new(
            definition,
            Arc::new(MotionConnection::with_transport(MockTransport::new())),
            Arc::new(StateConnection::with_transport(MockTransport::new())),
            Arc::new(IoConnection::with_transport(MockTransport::new())),
        );
        assert!(matches!(group, Err(MotoError::InvalidArgument(_))));
    }

    #[test]
    fn test_velocity_is_truncated_to_num_joints() {
        let state = MockTransport::new();
        state.push_read(&feedback_frame(0));
        let group = group_over(
            ControlGroupDefinition::new("R1", 0, 6).unwrap(),
            MockTransport::new(),
            state,
        );
        assert_eq!(group.velocity(), None);

        group.state.start().unwrap();
        group.state.join();

        assert_eq!(group.velocity().unwrap(), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(group.position().unwrap().len(), 6);
        assert_eq!(group.acceleration().unwrap(), vec![0.0; 6]);
    }

    #[test]
    fn test_feedback_for_other_group_is_not_visible() {
        let state = MockTransport::new();
        state.push_read(&feedback_frame(1));
        let group = group_over(
            ControlGroupDefinition::new("R1", 0, 6).unwrap(),
            MockTransport::new(),
            state,
        );
        group.state.start().unwrap();
        group.state.join();
        assert!(group.joint_feedback().is_none());
    }

    #[test]
    fn test_traj_point_is_addressed_to_group() {
        let motion = MockTransport::new();
        motion.respond_with(|frame| {
            let point = match codec::decode_bytes(frame).unwrap().body {
                Body::JointTrajPtFull(point) => point,
                other => panic!("unexpected request {:?}", other),
            };
            let reply = MotoMotionReply {
                groupno: point.groupno,
                sequence: point.sequence,
                command: 0,
                result: ResultType::Success.code(),
                subcode: 0,
                data: [0.0; ROS_MAX_JOINT],
            };
            vec![codec::encode(
                &Header::new(MsgType::MotoMotionReply, CommType::ServiceReply, ReplyType::Success),
                &reply.into(),
            )]
        });
        let group = group_over(
            ControlGroupDefinition::new("B1", 2, 1).unwrap(),
            motion.clone(),
            MockTransport::new(),
        );
        group.motion.start().unwrap();

        let reply = group
            .send_joint_traj_pt_full(JointTrajPtFull {
                groupno: 0,
                sequence: 3,
                valid_fields: ValidFields::TIME | ValidFields::POSITION,
                time: 0.5,
                pos: [0.0; ROS_MAX_JOINT],
                vel: [0.0; ROS_MAX_JOINT],
                acc: [0.0; ROS_MAX_JOINT],
            })
            .unwrap();
        assert_eq!(reply.groupno, 2);
        assert_eq!(reply.sequence, 3);
        assert_eq!(motion.frames().len(), 1);
    }

    #[test]
    fn test_queue_count_uses_group_number() {
        let motion = MockTransport::new();
        motion.respond_with(|frame| {
            let ctrl = match codec::decode_bytes(frame).unwrap().body {
                Body::MotionCtrl(ctrl) => ctrl,
                other => panic!("unexpected request {:?}", other),
            };
            let mut data = [0.0; ROS_MAX_JOINT];
            data[0] = 5.0;
            let reply = MotoMotionReply {
                groupno: ctrl.groupno,
                sequence: ctrl.sequence,
                command: ctrl.command,
                result: ResultType::Success.code(),
                subcode: 0,
                data,
            };
            vec![codec::encode(
                &Header::new(MsgType::MotoMotionReply, CommType::ServiceReply, ReplyType::Success),
                &reply.into(),
            )]
        });
        let group = group_over(
            ControlGroupDefinition::new("R2", 1, 6).unwrap(),
            motion,
            MockTransport::new(),
        );
        group.motion.start().unwrap();
        let reply = group.check_queue_count().unwrap();
        assert_eq!(reply.groupno, 1);
        assert_eq!(reply.data[0], 5.0);
    }
}
