//! State connection: unsolicited telemetry drained by a background reader
//!
//! The controller pushes joint feedback and robot status continuously. A
//! dedicated thread decodes frames in wire order, stores the latest value of
//! each kind in a watch cell, and fans every frame out to the callbacks
//! registered for its kind, in registration order.

use crate::connection::{ConnectionState, Link};
use crate::error::{MotoError, Result};
use crate::messages::{Body, JointFeedback, JointFeedbackEx, RobotStatus, MAX_CONTROLLABLE_GROUPS};
use crate::transport::{Interrupt, TcpTransport, Transport};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::JoinHandle;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

pub const TCP_PORT_STATE: u16 = 50241;

type Callback<M> = Arc<dyn Fn(&M) + Send + Sync>;

/// Ordered, thread-safe list of subscribers for one telemetry kind.
pub struct CallbackRegistry<M> {
    callbacks: RwLock<Vec<Callback<M>>>,
}

impl<M> Default for CallbackRegistry<M> {
    fn default() -> Self {
        Self {
            callbacks: RwLock::new(Vec::new()),
        }
    }
}

impl<M> CallbackRegistry<M> {
    pub fn add<F>(&self, callback: F)
    where
        F: Fn(&M) + Send + Sync + 'static,
    {
        self.callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(callback));
    }

    /// Invokes every callback once, in registration order. The list is
    /// snapshotted first so a callback may register further callbacks. A
    /// callback that panics is logged and the remaining ones still run.
    pub fn dispatch(&self, message: &M) {
        let snapshot: Vec<Callback<M>> = self
            .callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for (index, callback) in snapshot.iter().enumerate() {
            if catch_unwind(AssertUnwindSafe(|| callback(message))).is_err() {
                error!("Telemetry callback #{} panicked", index);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Last-known values and subscribers, shared with the reader thread.
struct Telemetry {
    joint_feedback: Vec<watch::Sender<Option<JointFeedback>>>,
    joint_feedback_ex: watch::Sender<Option<JointFeedbackEx>>,
    robot_status: watch::Sender<Option<RobotStatus>>,
    joint_feedback_callbacks: CallbackRegistry<JointFeedback>,
    joint_feedback_ex_callbacks: CallbackRegistry<JointFeedbackEx>,
    robot_status_callbacks: CallbackRegistry<RobotStatus>,
    link_state: Mutex<ConnectionState>,
}

impl Telemetry {
    fn new() -> Self {
        Self {
            joint_feedback: (0..MAX_CONTROLLABLE_GROUPS)
                .map(|_| watch::channel(None).0)
                .collect(),
            joint_feedback_ex: watch::channel(None).0,
            robot_status: watch::channel(None).0,
            joint_feedback_callbacks: CallbackRegistry::default(),
            joint_feedback_ex_callbacks: CallbackRegistry::default(),
            robot_status_callbacks: CallbackRegistry::default(),
            link_state: Mutex::new(ConnectionState::Unconnected),
        }
    }

    fn set_state(&self, state: ConnectionState) {
        *self.link_state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn state(&self) -> ConnectionState {
        *self.link_state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, body: Body) {
        match body {
            Body::JointFeedback(feedback) => {
                match usize::try_from(feedback.groupno)
                    .ok()
                    .and_then(|groupno| self.joint_feedback.get(groupno))
                {
                    Some(cell) => {
                        cell.send_replace(Some(feedback.clone()));
                    }
                    None => warn!("Joint feedback for unknown group {}", feedback.groupno),
                }
                self.joint_feedback_callbacks.dispatch(&feedback);
            }
            Body::JointFeedbackEx(feedback) => {
                self.joint_feedback_ex.send_replace(Some(feedback.clone()));
                self.joint_feedback_ex_callbacks.dispatch(&feedback);
            }
            Body::RobotStatus(status) => {
                self.robot_status.send_replace(Some(status.clone()));
                self.robot_status_callbacks.dispatch(&status);
            }
            other => debug!("Ignoring {:?} on state connection", other.msg_type()),
        }
    }
}

/// Waits for a finished (or interrupted) reader and takes its link back.
fn reclaim<T>(slot: &mut ReaderSlot<T>, telemetry: &Telemetry) {
    if !matches!(slot, ReaderSlot::Running { .. }) {
        return;
    }
    if let ReaderSlot::Running { handle, .. } = std::mem::replace(slot, ReaderSlot::Lost) {
        match handle.join() {
            Ok(link) => *slot = ReaderSlot::Idle(link),
            Err(_) => {
                error!("State reader panicked; connection is lost");
                telemetry.set_state(ConnectionState::Broken);
            }
        }
    }
}

enum ReaderSlot<T> {
    Idle(Link<T>),
    Running {
        handle: JoinHandle<Link<T>>,
        interrupt: Option<Interrupt>,
    },
    Lost,
}

/// Telemetry subscription to the controller's state server.
pub struct StateConnection<T: Transport + 'static = TcpTransport> {
    telemetry: Arc<Telemetry>,
    reader: Mutex<ReaderSlot<T>>,
}

impl StateConnection<TcpTransport> {
    pub fn new(host: &str) -> Self {
        Self::with_transport(TcpTransport::new(host, TCP_PORT_STATE))
    }
}

impl<T: Transport + 'static> StateConnection<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            telemetry: Arc::new(Telemetry::new()),
            reader: Mutex::new(ReaderSlot::Idle(Link::new("state", transport))),
        }
    }

    fn slot(&self) -> MutexGuard<'_, ReaderSlot<T>> {
        self.reader.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Connects and spawns the reader. Calling it while the reader is alive
    /// is a no-op; after the reader died it reconnects.
    pub fn start(&self) -> Result<()> {
        let mut slot = self.slot();
        if let ReaderSlot::Running { handle, .. } = &*slot {
            if !handle.is_finished() {
                return Ok(());
            }
        }
        reclaim(&mut *slot, &self.telemetry);

        let mut link = match std::mem::replace(&mut *slot, ReaderSlot::Lost) {
            ReaderSlot::Idle(link) => link,
            _ => {
                return Err(MotoError::ConnectionClosed(
                    "state reader was lost and cannot be restarted".to_string(),
                ))
            }
        };
        if let Err(e) = link.connect() {
            self.telemetry.set_state(link.state());
            *slot = ReaderSlot::Idle(link);
            return Err(e);
        }
        self.telemetry.set_state(ConnectionState::Connected);

        let interrupt = link.interrupter();
        let telemetry = Arc::clone(&self.telemetry);
        let handle = std::thread::Builder::new()
            .name("moto-state".to_string())
            .spawn(move || run_reader(link, telemetry))?;
        *slot = ReaderSlot::Running { handle, interrupt };
        Ok(())
    }

    /// Blocks until the reader exits on its own (peer close or error).
    pub fn join(&self) {
        let mut slot = self.slot();
        reclaim(&mut *slot, &self.telemetry);
    }

    /// Interrupts the reader, waits for it and closes the socket.
    pub fn stop(&self) {
        let mut slot = self.slot();
        if let ReaderSlot::Running {
            interrupt: Some(interrupt),
            ..
        } = &*slot
        {
            interrupt();
        }
        reclaim(&mut *slot, &self.telemetry);
        if let ReaderSlot::Idle(link) = &mut *slot {
            link.close();
            self.telemetry.set_state(link.state());
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.telemetry.state()
    }

    pub fn is_running(&self) -> bool {
        matches!(&*self.slot(), ReaderSlot::Running { handle, .. } if !handle.is_finished())
    }

    /// Most recent feedback for `groupno`, if any has arrived.
    pub fn joint_feedback(&self, groupno: i32) -> Option<JointFeedback> {
        let cell = self.telemetry.joint_feedback.get(usize::try_from(groupno).ok()?)?;
        let latest = cell.borrow().clone();
        latest
    }

    pub fn joint_feedback_ex(&self) -> Option<JointFeedbackEx> {
        self.telemetry.joint_feedback_ex.borrow().clone()
    }

    pub fn robot_status(&self) -> Option<RobotStatus> {
        self.telemetry.robot_status.borrow().clone()
    }

    pub fn add_joint_feedback_msg_callback<F>(&self, callback: F)
    where
        F: Fn(&JointFeedback) + Send + Sync + 'static,
    {
        self.telemetry.joint_feedback_callbacks.add(callback);
    }

    pub fn add_joint_feedback_ex_msg_callback<F>(&self, callback: F)
    where
        F: Fn(&JointFeedbackEx) + Send + Sync + 'static,
    {
        self.telemetry.joint_feedback_ex_callbacks.add(callback);
    }

    pub fn add_robot_status_callback<F>(&self, callback: F)
    where
        F: Fn(&RobotStatus) + Send + Sync + 'static,
    {
        self.telemetry.robot_status_callbacks.add(callback);
    }

    /// Async-friendly view of the latest robot status.
    pub fn subscribe_robot_status(&self) -> watch::Receiver<Option<RobotStatus>> {
        self.telemetry.robot_status.subscribe()
    }

    pub fn subscribe_joint_feedback(&self, groupno: i32) -> Option<watch::Receiver<Option<JointFeedback>>> {
        let cell = self.telemetry.joint_feedback.get(usize::try_from(groupno).ok()?)?;
        Some(cell.subscribe())
    }
}

impl<T: Transport + 'static> Drop for StateConnection<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_reader<T: Transport>(mut link: Link<T>, telemetry: Arc<Telemetry>) -> Link<T> {
    info!("State reader started");
    loop {
        match link.read_frame() {
            Ok(frame) => telemetry.publish(frame.body),
            Err(MotoError::Frame(e)) => {
                error!("State stream desynchronised: {}", e);
                break;
            }
            Err(e) => {
                info!("State reader stopped: {}", e);
                break;
            }
        }
    }
    telemetry.set_state(link.state());
    link
}
