//! Motion connection: synchronous motion-control commands and trajectory points

use crate::codec::Frame;
use crate::connection::{unexpected, ConnectionState, SimpleMessageConnection};
use crate::error::{MotoError, Result};
use crate::messages::{
    Body, CommandType, JointTrajPtFull, JointTrajPtFullEx, MotoMotionCtrl, MotoMotionReply, MotoSelectTool,
    MsgType, MAX_CONTROLLABLE_GROUPS,
};
use crate::transport::{TcpTransport, Transport};
use tracing::{debug, warn};

pub const TCP_PORT_MOTION: u16 = 50240;

/// Group number addressing every group at once.
pub const ALL_GROUPS: i32 = -1;

/// Sequence number for commands that are not part of a trajectory.
pub const NO_SEQUENCE: i32 = -1;

/// A trajectory point in either the single-group or multi-group form.
#[derive(Debug, Clone, PartialEq)]
pub enum JointTrajectoryPoint {
    Full(JointTrajPtFull),
    FullEx(JointTrajPtFullEx),
}

impl From<JointTrajPtFull> for JointTrajectoryPoint {
    fn from(point: JointTrajPtFull) -> Self {
        JointTrajectoryPoint::Full(point)
    }
}

impl From<JointTrajPtFullEx> for JointTrajectoryPoint {
    fn from(point: JointTrajPtFullEx) -> Self {
        JointTrajectoryPoint::FullEx(point)
    }
}

/// Command/reply connection to the controller's motion server.
///
/// Negative results ("not ready", "busy", ...) are returned as the reply,
/// not as errors. Only transport and framing failures are errors.
pub struct MotionConnection<T: Transport = TcpTransport> {
    conn: SimpleMessageConnection<T>,
}

impl MotionConnection<TcpTransport> {
    pub fn new(host: &str) -> Self {
        Self::with_transport(TcpTransport::new(host, TCP_PORT_MOTION))
    }
}

impl<T: Transport> MotionConnection<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            conn: SimpleMessageConnection::new("motion", transport),
        }
    }

    pub fn start(&self) -> Result<()> {
        self.conn.start()
    }

    pub fn state(&self) -> ConnectionState {
        self.conn.state()
    }

    pub fn close(&self) {
        self.conn.close()
    }

    fn expect_reply(frame: Frame) -> Result<MotoMotionReply> {
        match frame.body {
            Body::MotionReply(reply) => Ok(reply),
            _ => Err(unexpected(MsgType::MotoMotionReply, &frame)),
        }
    }

    fn command(&self, groupno: i32, sequence: i32, command: CommandType) -> Result<MotoMotionReply> {
        let reply = Self::expect_reply(
            self.conn
                .send_and_receive(MotoMotionCtrl::new(groupno, sequence, command))?,
        )?;
        debug!(
            "{:?} on group {} -> result {} subcode {}",
            command, groupno, reply.result, reply.subcode
        );
        Ok(reply)
    }

    pub fn check_motion_ready(&self, groupno: i32, sequence: i32) -> Result<MotoMotionReply> {
        self.command(groupno, sequence, CommandType::CheckMotionReady)
    }

    /// Number of points queued for `groupno`, reported in `data[0]`.
    pub fn check_queue_count(&self, groupno: i32, sequence: i32) -> Result<MotoMotionReply> {
        self.command(groupno, sequence, CommandType::CheckQueueCount)
    }

    pub fn stop_motion(&self, groupno: i32, sequence: i32) -> Result<MotoMotionReply> {
        self.command(groupno, sequence, CommandType::StopMotion)
    }

    pub fn start_servos(&self, groupno: i32, sequence: i32) -> Result<MotoMotionReply> {
        self.command(groupno, sequence, CommandType::StartServos)
    }

    pub fn stop_servos(&self, groupno: i32, sequence: i32) -> Result<MotoMotionReply> {
        self.command(groupno, sequence, CommandType::StopServos)
    }

    pub fn reset_alarm(&self, groupno: i32, sequence: i32) -> Result<MotoMotionReply> {
        self.command(groupno, sequence, CommandType::ResetAlarm)
    }

    pub fn start_traj_mode(&self, groupno: i32, sequence: i32) -> Result<MotoMotionReply> {
        self.command(groupno, sequence, CommandType::StartTrajMode)
    }

    pub fn stop_traj_mode(&self, groupno: i32, sequence: i32) -> Result<MotoMotionReply> {
        self.command(groupno, sequence, CommandType::StopTrajMode)
    }

    /// Asks the controller to end the session. The socket stays open until
    /// [`close`](Self::close).
    pub fn disconnect(&self, groupno: i32, sequence: i32) -> Result<MotoMotionReply> {
        self.command(groupno, sequence, CommandType::Disconnect)
    }

    pub fn select_tool(&self, groupno: i32, tool: i32, sequence: i32) -> Result<MotoMotionReply> {
        Self::expect_reply(self.conn.send_and_receive(MotoSelectTool {
            groupno,
            tool,
            sequence,
        })?)
    }

    /// Sends one trajectory point and returns the controller's verdict.
    pub fn send_joint_trajectory_point(&self, point: impl Into<JointTrajectoryPoint>) -> Result<MotoMotionReply> {
        let body: Body = match point.into() {
            JointTrajectoryPoint::Full(point) => point.into(),
            JointTrajectoryPoint::FullEx(point) => {
                if point.number_of_valid_groups() > MAX_CONTROLLABLE_GROUPS {
                    return Err(MotoError::InvalidArgument(format!(
                        "trajectory point addresses {} groups, at most {} are controllable",
                        point.number_of_valid_groups(),
                        MAX_CONTROLLABLE_GROUPS
                    )));
                }
                point.into()
            }
        };
        let reply = Self::expect_reply(self.conn.send_and_receive(body)?)?;
        if !reply.is_success() {
            warn!(
                "Trajectory point {} rejected: result {} subcode {}",
                reply.sequence, reply.result, reply.subcode
            );
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{self, Header};
    use crate::messages::{
        CommType, JointTrajPtExData, ReplyType, ResultType, ValidFields, ROS_MAX_JOINT,
    };
    use crate::transport::mock::MockTransport;
    use std::sync::Arc;

    /// Answers every motion request with a reply echoing group, sequence and command.
    fn echo_controller(mock: &MockTransport) {
        mock.respond_with(|frame| {
            let request = codec::decode_bytes(frame).unwrap();
            let (groupno, sequence, command) = match request.body {
                Body::MotionCtrl(ctrl) => (ctrl.groupno, ctrl.sequence, ctrl.command),
                Body::SelectTool(tool) => (tool.groupno, tool.sequence, 0),
                Body::JointTrajPtFull(pt) => (pt.groupno, pt.sequence, 0),
                Body::JointTrajPtFullEx(pt) => (-1, pt.sequence, 0),
                other => panic!("unexpected request {:?}", other),
            };
            let reply = MotoMotionReply {
                groupno,
                sequence,
                command,
                result: ResultType::Success.code(),
                subcode: 0,
                data: [0.0; ROS_MAX_JOINT],
            };
            vec![codec::encode(
                &Header::new(MsgType::MotoMotionReply, CommType::ServiceReply, ReplyType::Success),
                &reply.into(),
            )]
        });
    }

    #[test]
    fn test_unconnected_traj_mode_fails_closed() {
        let motion = MotionConnection::with_transport(MockTransport::new());
        let start = motion.start_traj_mode(0, NO_SEQUENCE).unwrap_err();
        let stop = motion.stop_traj_mode(0, NO_SEQUENCE).unwrap_err();
        assert!(matches!(start, MotoError::ConnectionClosed(_)));
        assert!(matches!(stop, MotoError::ConnectionClosed(_)));
    }

    #[test]
    fn test_command_round_trip() {
        let mock = MockTransport::new();
        echo_controller(&mock);
        let motion = MotionConnection::with_transport(mock.clone());
        motion.start().unwrap();

        let reply = motion.start_servos(ALL_GROUPS, 4).unwrap();
        assert!(reply.is_success());
        assert_eq!(reply.command_type(), Some(CommandType::StartServos));
        assert_eq!(reply.sequence, 4);

        let sent = codec::decode_bytes(&mock.frames()[0]).unwrap();
        assert_eq!(sent.header, Header::request(MsgType::MotoMotionCtrl));
    }

    #[test]
    fn test_select_tool_request_and_reply() {
        let mock = MockTransport::new();
        echo_controller(&mock);
        let motion = MotionConnection::with_transport(mock.clone());
        motion.start().unwrap();

        let reply = motion.select_tool(1, 3, 9).unwrap();
        assert!(reply.is_success());
        assert_eq!(reply.groupno, 1);
        assert_eq!(reply.sequence, 9);

        let mut expected = Vec::new();
        for word in [24i32, 2018, 2, 0, 1, 3, 9] {
            expected.extend_from_slice(&word.to_le_bytes());
        }
        assert_eq!(mock.frames(), vec![expected]);
    }

    #[test]
    fn test_not_ready_is_a_value_not_an_error() {
        let mock = MockTransport::new();
        mock.respond_with(|_| {
            let reply = MotoMotionReply {
                groupno: 0,
                sequence: -1,
                command: CommandType::CheckMotionReady.code(),
                result: ResultType::NotReady.code(),
                subcode: 5006,
                data: [0.0; ROS_MAX_JOINT],
            };
            vec![codec::encode(
                &Header::new(MsgType::MotoMotionReply, CommType::ServiceReply, ReplyType::Failure),
                &reply.into(),
            )]
        });
        let motion = MotionConnection::with_transport(mock);
        motion.start().unwrap();
        let reply = motion.check_motion_ready(0, NO_SEQUENCE).unwrap();
        assert_eq!(reply.result_type(), ResultType::NotReady);
        assert_eq!(motion.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_wrong_reply_type_is_frame_error() {
        let mock = MockTransport::new();
        mock.respond_with(|_| {
            vec![codec::encode(
                &Header::new(MsgType::MotoWriteIoBitReply, CommType::ServiceReply, ReplyType::Success),
                &crate::messages::MotoWriteIoBitReply { result_code: 0 }.into(),
            )]
        });
        let motion = MotionConnection::with_transport(mock);
        motion.start().unwrap();
        let err = motion.reset_alarm(ALL_GROUPS, NO_SEQUENCE).unwrap_err();
        assert!(matches!(err, MotoError::Frame(_)));
    }

    #[test]
    fn test_trajectory_point_forms() {
        let mock = MockTransport::new();
        echo_controller(&mock);
        let motion = MotionConnection::with_transport(mock.clone());
        motion.start().unwrap();

        let full = JointTrajPtFull {
            groupno: 0,
            sequence: 0,
            valid_fields: ValidFields::TIME | ValidFields::POSITION | ValidFields::VELOCITY,
            time: 0.0,
            pos: [0.0; ROS_MAX_JOINT],
            vel: [0.0; ROS_MAX_JOINT],
            acc: [0.0; ROS_MAX_JOINT],
        };
        assert!(motion.send_joint_trajectory_point(full).unwrap().is_success());

        let data = JointTrajPtExData {
            groupno: 0,
            valid_fields: ValidFields::TIME | ValidFields::POSITION,
            time: 5.0,
            pos: [0.1; ROS_MAX_JOINT],
            vel: [0.0; ROS_MAX_JOINT],
            acc: [0.0; ROS_MAX_JOINT],
        };
        let ex = JointTrajPtFullEx {
            sequence: 1,
            joint_traj_pt_data: vec![data.clone()],
        };
        assert_eq!(motion.send_joint_trajectory_point(ex).unwrap().sequence, 1);

        let too_many = JointTrajPtFullEx {
            sequence: 2,
            joint_traj_pt_data: vec![data; MAX_CONTROLLABLE_GROUPS + 1],
        };
        assert!(matches!(
            motion.send_joint_trajectory_point(too_many),
            Err(MotoError::InvalidArgument(_))
        ));
        assert_eq!(mock.frames().len(), 2);
    }

    #[test]
    fn test_concurrent_callers_never_interleave() {
        let mock = MockTransport::new();
        echo_controller(&mock);
        mock.limit_write(7, Some(std::time::Duration::from_micros(200)));
        let motion = Arc::new(MotionConnection::with_transport(mock.clone()));
        motion.start().unwrap();

        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let motion = Arc::clone(&motion);
                std::thread::spawn(move || {
                    for i in 0..10 {
                        let sequence = worker * 100 + i;
                        let reply = motion.check_queue_count(worker, sequence).unwrap();
                        assert_eq!(reply.sequence, sequence);
                        assert_eq!(reply.groupno, worker);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(mock.overlaps(), 0);
        let frames = mock.frames();
        assert_eq!(frames.len(), 40);
        for frame in frames {
            assert!(matches!(
                codec::decode_bytes(&frame).unwrap().body,
                Body::MotionCtrl(_)
            ));
        }
    }
}
