//! `Moto`: one session against a controller, owning all four connections

use crate::config::Config;
use crate::control_group::ControlGroup;
use crate::connection::ConnectionState;
use crate::error::Result;
use crate::io_connection::IoConnection;
use crate::motion_connection::{MotionConnection, ALL_GROUPS, NO_SEQUENCE};
use crate::realtime_connection::RealTimeConnection;
use crate::state_connection::StateConnection;
use crate::transport::{TcpTransport, Transport};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Transports for the four roles, used when not dialing TCP directly.
pub struct SessionTransports<T> {
    pub motion: T,
    pub state: T,
    pub io: T,
    pub realtime: T,
}

pub struct Moto<T: Transport + 'static = TcpTransport> {
    config: Config,
    motion: Arc<MotionConnection<T>>,
    state: Arc<StateConnection<T>>,
    io: Arc<IoConnection<T>>,
    realtime: Arc<RealTimeConnection<T>>,
    control_groups: HashMap<String, ControlGroup<T>>,
}

impl Moto<TcpTransport> {
    /// Builds the session and opens the connections enabled in `config`.
    pub fn connect(config: Config) -> Result<Self> {
        let robot = &config.robot;
        let tcp = |port| TcpTransport::new(&robot.host, port).with_timeout(robot.timeout());
        let transports = SessionTransports {
            motion: tcp(robot.ports.motion),
            state: tcp(robot.ports.state),
            io: tcp(robot.ports.io),
            realtime: tcp(robot.ports.realtime),
        };
        Self::with_transports(config, transports)
    }
}

impl<T: Transport + 'static> Moto<T> {
    pub fn with_transports(config: Config, transports: SessionTransports<T>) -> Result<Self> {
        config.validate()?;
        let motion = Arc::new(MotionConnection::with_transport(transports.motion));
        let state = Arc::new(StateConnection::with_transport(transports.state));
        let io = Arc::new(IoConnection::with_transport(transports.io));
        let realtime = Arc::new(RealTimeConnection::with_transport(transports.realtime));

        let control_groups: HashMap<String, ControlGroup<T>> = config
            .control_groups
            .iter()
            .map(|definition| {
                let group = ControlGroup::new(
                    definition.clone(),
                    Arc::clone(&motion),
                    Arc::clone(&state),
                    Arc::clone(&io),
                )?;
                Ok((definition.groupid.clone(), group))
            })
            .collect::<Result<_>>()?;

        let session = Self {
            config,
            motion,
            state,
            io,
            realtime,
            control_groups,
        };

        let start = &session.config.robot.start;
        if start.motion {
            session.motion.start()?;
        }
        if start.state {
            session.state.start()?;
        }
        if start.io {
            session.io.start()?;
        }
        if start.realtime {
            session.realtime.start()?;
        }
        info!(
            "Session with {} ready ({} control groups)",
            session.config.robot.host,
            session.control_groups.len()
        );
        Ok(session)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn motion(&self) -> &MotionConnection<T> {
        &self.motion
    }

    pub fn state(&self) -> &StateConnection<T> {
        &self.state
    }

    pub fn io(&self) -> &IoConnection<T> {
        &self.io
    }

    pub fn realtime(&self) -> &RealTimeConnection<T> {
        &self.realtime
    }

    pub fn control_groups(&self) -> &HashMap<String, ControlGroup<T>> {
        &self.control_groups
    }

    pub fn control_group(&self, groupid: &str) -> Option<&ControlGroup<T>> {
        self.control_groups.get(groupid)
    }

    /// Tells the controller the session is over (best effort), stops the
    /// state reader and closes every socket.
    pub fn disconnect(&self) {
        if self.motion.state() == ConnectionState::Connected {
            if let Err(e) = self.motion.disconnect(ALL_GROUPS, NO_SEQUENCE) {
                warn!("Disconnect request failed: {}", e);
            }
        }
        self.state.stop();
        self.io.close();
        self.realtime.close();
        self.motion.close();
        info!("Session with {} closed", self.config.robot.host);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{self, Header};
    use crate::control_group::ControlGroupDefinition;
    use crate::messages::{Body, CommType, CommandType, MotoMotionReply, MsgType, ReplyType, ROS_MAX_JOINT};
    use crate::transport::mock::MockTransport;

    fn transports() -> SessionTransports<MockTransport> {
        SessionTransports {
            motion: MockTransport::new(),
            state: MockTransport::new(),
            io: MockTransport::new(),
            realtime: MockTransport::new(),
        }
    }

    fn config() -> Config {
        Config::new(
            "127.0.0.1",
            vec![
                ControlGroupDefinition::new("R1", 0, 6).unwrap(),
                ControlGroupDefinition::new("S1", 1, 2).unwrap(),
            ],
        )
    }

    #[test]
    fn test_start_flags_select_connections() {
        let mocks = transports();
        let (motion, state, io, realtime) = (
            mocks.motion.clone(),
            mocks.state.clone(),
            mocks.io.clone(),
            mocks.realtime.clone(),
        );
        let session = Moto::with_transports(config(), mocks).unwrap();

        assert_eq!(motion.connects(), 1);
        assert_eq!(state.connects(), 1);
        assert_eq!(io.connects(), 1);
        assert_eq!(realtime.connects(), 0);
        assert_eq!(session.realtime().state(), ConnectionState::Unconnected);
        assert_eq!(session.control_groups().len(), 2);
        assert_eq!(session.control_group("S1").unwrap().num_joints(), 2);
    }

    #[test]
    fn test_failed_start_is_reported() {
        let mocks = transports();
        mocks.io.refuse_connect(true);
        assert!(Moto::with_transports(config(), mocks).is_err());
    }

    #[test]
    fn test_disconnect_sends_request_and_closes() {
        let mocks = transports();
        mocks.motion.respond_with(|frame| {
            let ctrl = match codec::decode_bytes(frame).unwrap().body {
                Body::MotionCtrl(ctrl) => ctrl,
                other => panic!("unexpected request {:?}", other),
            };
            let reply = MotoMotionReply {
                groupno: ctrl.groupno,
                sequence: ctrl.sequence,
                command: ctrl.command,
                result: 0,
                subcode: 0,
                data: [0.0; ROS_MAX_JOINT],
            };
            vec![codec::encode(
                &Header::new(MsgType::MotoMotionReply, CommType::ServiceReply, ReplyType::Success),
                &reply.into(),
            )]
        });
        let motion = mocks.motion.clone();
        let session = Moto::with_transports(config(), mocks).unwrap();

        session.disconnect();

        let sent = codec::decode_bytes(&motion.frames()[0]).unwrap();
        match sent.body {
            Body::MotionCtrl(ctrl) => assert_eq!(ctrl.command, CommandType::Disconnect.code()),
            other => panic!("unexpected body {:?}", other),
        }
        assert_eq!(session.motion().state(), ConnectionState::Closed);
        assert_eq!(session.io().state(), ConnectionState::Closed);
        assert!(!motion.is_connected());
    }
}
