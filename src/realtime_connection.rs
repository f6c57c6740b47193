//! Real-time motion connection
//!
//! After [`RealTimeConnection::start_rt_mode`] succeeds the controller pushes
//! one [`RealTimeMotionJointStateEx`] per interpolation cycle and expects a
//! [`RealTimeMotionJointCommandEx`] echoing its `message_id` in return. The
//! connection exposes the two halves of that exchange; pacing is up to the
//! caller. Samples that arrive while a mode command awaits its reply are
//! dropped.

use crate::codec::{Frame, Header};
use crate::connection::{unexpected, ConnectionState, SimpleMessageConnection};
use crate::error::Result;
use crate::messages::{
    Body, CommandType, MotoMotionCtrl, MotoMotionReply, MsgType, RealTimeMotionJointCommandEx,
    RealTimeMotionJointStateEx,
};
use crate::motion_connection::{ALL_GROUPS, NO_SEQUENCE};
use crate::transport::{TcpTransport, Transport};
use tracing::{debug, info, warn};

pub const TCP_PORT_REALTIME: u16 = 50243;

pub struct RealTimeConnection<T: Transport = TcpTransport> {
    conn: SimpleMessageConnection<T>,
}

impl RealTimeConnection<TcpTransport> {
    pub fn new(host: &str) -> Self {
        Self::with_transport(TcpTransport::new(host, TCP_PORT_REALTIME))
    }
}

impl<T: Transport> RealTimeConnection<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            conn: SimpleMessageConnection::new("realtime", transport),
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

    fn mode_command(&self, command: CommandType) -> Result<MotoMotionReply> {
        // State samples keep arriving until the controller leaves RT mode.
        let frame = self.conn.send_and_receive_skipping(
            MotoMotionCtrl::new(ALL_GROUPS, NO_SEQUENCE, command),
            |frame| matches!(frame.body, Body::RealTimeJointStateEx(_)),
        )?;
        let reply = match frame.body {
            Body::MotionReply(reply) => reply,
            _ => return Err(unexpected(MsgType::MotoMotionReply, &frame)),
        };
        if reply.is_success() {
            info!("{:?} accepted", command);
        } else {
            warn!("{:?} rejected: result {} subcode {}", command, reply.result, reply.subcode);
        }
        Ok(reply)
    }

    pub fn start_rt_mode(&self) -> Result<MotoMotionReply> {
        self.mode_command(CommandType::StartRealTimeMotionMode)
    }

    pub fn stop_rt_mode(&self) -> Result<MotoMotionReply> {
        self.mode_command(CommandType::StopRealTimeMotionMode)
    }

    /// Blocks for the next state sample.
    pub fn recv_state(&self) -> Result<RealTimeMotionJointStateEx> {
        let frame: Frame = self.conn.recv()?;
        match frame.body {
            Body::RealTimeJointStateEx(state) => Ok(state),
            _ => Err(unexpected(MsgType::MotoRealTimeMotionJointStateEx, &frame)),
        }
    }

    /// Sends a command as a topic; the controller does not reply.
    pub fn send_command(&self, command: RealTimeMotionJointCommandEx) -> Result<()> {
        debug!(
            "Real-time command {} for {} groups",
            command.message_id,
            command.joint_command_data.len()
        );
        self.conn.send(
            &Header::topic(MsgType::MotoRealTimeMotionJointCommandEx),
            &command.into(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{self, Header};
    use crate::error::MotoError;
    use crate::messages::{
        CommType, RealTimeMotionJointCommandExData, RealTimeMotionJointStateExData, ReplyType, ResultType,
        MAX_CONTROLLABLE_GROUPS, ROS_MAX_JOINT,
    };
    use crate::transport::mock::MockTransport;

    fn state_sample(message_id: i32) -> Vec<u8> {
        let body: Body = RealTimeMotionJointStateEx {
            message_id,
            mode: 1,
            joint_state_data: vec![RealTimeMotionJointStateExData {
                groupno: 0,
                pos: [0.5; ROS_MAX_JOINT],
                vel: [0.0; ROS_MAX_JOINT],
            }],
        }
        .into();
        codec::encode(&Header::topic(body.msg_type()), &body)
    }

    #[test]
    fn test_start_rt_mode_uses_realtime_command_code() {
        let mock = MockTransport::new();
        mock.respond_with(|frame| {
            let ctrl = match codec::decode_bytes(frame).unwrap().body {
                Body::MotionCtrl(ctrl) => ctrl,
                other => panic!("unexpected request {:?}", other),
            };
            let reply = MotoMotionReply {
                groupno: ctrl.groupno,
                sequence: ctrl.sequence,
                command: ctrl.command,
                result: ResultType::Success.code(),
                subcode: 0,
                data: [0.0; ROS_MAX_JOINT],
            };
            vec![codec::encode(
                &Header::new(MsgType::MotoMotionReply, CommType::ServiceReply, ReplyType::Success),
                &reply.into(),
            )]
        });
        let rt = RealTimeConnection::with_transport(mock);
        rt.start().unwrap();

        let reply = rt.start_rt_mode().unwrap();
        assert_eq!(reply.command, 200140);
        assert_eq!(rt.stop_rt_mode().unwrap().command, 200141);
    }

    #[test]
    fn test_stop_rt_mode_skips_pending_state_samples() {
        let mock = MockTransport::new();
        mock.respond_with(|frame| {
            let ctrl = match codec::decode_bytes(frame).unwrap().body {
                Body::MotionCtrl(ctrl) => ctrl,
                other => panic!("unexpected request {:?}", other),
            };
            let reply = MotoMotionReply {
                groupno: ctrl.groupno,
                sequence: ctrl.sequence,
                command: ctrl.command,
                result: ResultType::Success.code(),
                subcode: 0,
                data: [0.0; ROS_MAX_JOINT],
            };
            vec![
                state_sample(11),
                state_sample(12),
                codec::encode(
                    &Header::new(MsgType::MotoMotionReply, CommType::ServiceReply, ReplyType::Success),
                    &reply.into(),
                ),
            ]
        });
        let rt = RealTimeConnection::with_transport(mock);
        rt.start().unwrap();

        let reply = rt.stop_rt_mode().unwrap();
        assert_eq!(reply.command, 200141);
        assert_eq!(rt.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_command_for_too_many_groups_is_refused() {
        let mock = MockTransport::new();
        let rt = RealTimeConnection::with_transport(mock.clone());
        rt.start().unwrap();

        let data = RealTimeMotionJointCommandExData {
            groupno: 0,
            command: [0.0; ROS_MAX_JOINT],
        };
        let err = rt
            .send_command(RealTimeMotionJointCommandEx {
                message_id: 1,
                joint_command_data: vec![data; MAX_CONTROLLABLE_GROUPS + 1],
            })
            .unwrap_err();
        assert!(matches!(err, MotoError::InvalidArgument(_)));
        assert!(mock.written().is_empty());
        assert_eq!(rt.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_state_then_command_cycle() {
        let mock = MockTransport::new();
        mock.push_read(&state_sample(7));
        let rt = RealTimeConnection::with_transport(mock.clone());
        rt.start().unwrap();

        let state = rt.recv_state().unwrap();
        assert_eq!(state.message_id, 7);
        assert_eq!(state.joint_state_data[0].pos[0], 0.5);

        rt.send_command(RealTimeMotionJointCommandEx {
            message_id: state.message_id,
            joint_command_data: vec![RealTimeMotionJointCommandExData {
                groupno: 0,
                command: [0.01; ROS_MAX_JOINT],
            }],
        })
        .unwrap();

        let sent = codec::decode_bytes(&mock.written()).unwrap();
        assert_eq!(sent.header.comm_type, CommType::Topic);
        match sent.body {
            Body::RealTimeJointCommandEx(command) => assert_eq!(command.message_id, 7),
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_recv_state_rejects_other_messages() {
        let mock = MockTransport::new();
        let body: Body = crate::messages::MotoWriteIoBitReply { result_code: 0 }.into();
        mock.push_read(&codec::encode(&Header::topic(body.msg_type()), &body));
        let rt = RealTimeConnection::with_transport(mock);
        rt.start().unwrap();
        assert!(matches!(rt.recv_state(), Err(MotoError::Frame(_))));
    }
}
