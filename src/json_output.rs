//! JSON output for telemetry and command results
//!
//! One event per line on stdout, for consumption by external tools.

use crate::messages::{
    JointFeedback, MotoIoCtrlReply, MotoMotionReply, RobotMode, RobotStatus, TriState,
};
use serde::Serialize;

/// Current time as seconds since UNIX epoch, millisecond precision
pub fn current_timestamp() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Envelope shared by every event
#[derive(Debug, Clone, Serialize)]
pub struct Event<P> {
    #[serde(rename = "type")]
    pub event_type: &'static str,
    pub stime: f64,
    #[serde(flatten)]
    pub payload: P,
}

impl<P: Serialize> Event<P> {
    pub fn new(event_type: &'static str, payload: P) -> Self {
        Self {
            event_type,
            stime: current_timestamp(),
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JointFeedbackPayload {
    pub groupno: i32,
    pub time: f32,
    pub valid_fields: i32,
    pub position: Vec<f32>,
    pub velocity: Vec<f32>,
    pub acceleration: Vec<f32>,
}

impl JointFeedbackPayload {
    /// Keeps the first `num_joints` entries of each array.
    pub fn new(feedback: &JointFeedback, num_joints: usize) -> Self {
        let n = num_joints.min(feedback.pos.len());
        Self {
            groupno: feedback.groupno,
            time: feedback.time,
            valid_fields: feedback.valid_fields.bits(),
            position: feedback.pos[..n].to_vec(),
            velocity: feedback.vel[..n].to_vec(),
            acceleration: feedback.acc[..n].to_vec(),
        }
    }
}

fn tri_state(value: TriState) -> Option<bool> {
    match value {
        TriState::True => Some(true),
        TriState::False => Some(false),
        TriState::Unknown => None,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RobotStatusPayload {
    pub drives_powered: Option<bool>,
    pub e_stopped: Option<bool>,
    pub in_error: Option<bool>,
    pub in_motion: Option<bool>,
    pub motion_possible: Option<bool>,
    pub error_code: i32,
    pub mode: &'static str,
}

impl From<&RobotStatus> for RobotStatusPayload {
    fn from(status: &RobotStatus) -> Self {
        Self {
            drives_powered: tri_state(status.drives_powered()),
            e_stopped: tri_state(status.e_stopped()),
            in_error: tri_state(status.in_error()),
            in_motion: tri_state(status.in_motion()),
            motion_possible: tri_state(status.motion_possible()),
            error_code: status.error_code,
            mode: match status.mode() {
                RobotMode::Manual => "manual",
                RobotMode::Auto => "auto",
                RobotMode::Unknown => "unknown",
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MotionReplyPayload {
    pub request: String,
    pub success: bool,
    pub result: String,
    pub subcode: String,
    pub reply: MotoMotionReply,
}

impl MotionReplyPayload {
    pub fn new(request: &str, reply: &MotoMotionReply) -> Self {
        Self {
            request: request.to_string(),
            success: reply.is_success(),
            result: format!("{:?}", reply.result_type()),
            subcode: format!("{:?}", reply.subcode_type()),
            reply: reply.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IoPayload {
    pub operation: &'static str,
    pub address: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected: Option<MotoIoCtrlReply>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub error: String,
}

pub fn joint_feedback_event(feedback: &JointFeedback, num_joints: usize) -> Event<JointFeedbackPayload> {
    Event::new("joint_feedback", JointFeedbackPayload::new(feedback, num_joints))
}

pub fn robot_status_event(status: &RobotStatus) -> Event<RobotStatusPayload> {
    Event::new("robot_status", status.into())
}

pub fn motion_reply_event(request: &str, reply: &MotoMotionReply) -> Event<MotionReplyPayload> {
    Event::new("motion_reply", MotionReplyPayload::new(request, reply))
}

pub fn io_event(payload: IoPayload) -> Event<IoPayload> {
    Event::new("io", payload)
}

pub fn error_event(error: &str) -> Event<ErrorPayload> {
    Event::new(
        "error",
        ErrorPayload {
            error: error.to_string(),
        },
    )
}

/// Output a JSON event to stdout
pub fn output_event<T: Serialize>(event: &T) {
    if let Ok(json) = serde_json::to_string(event) {
        println!("{}", json);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{ValidFields, ROS_MAX_JOINT};
    use serde_json::Value;

    #[test]
    fn test_feedback_event_shape() {
        let feedback = JointFeedback {
            groupno: 0,
            valid_fields: ValidFields::POSITION,
            time: 1.5,
            pos: [0.25; ROS_MAX_JOINT],
            vel: [0.0; ROS_MAX_JOINT],
            acc: [0.0; ROS_MAX_JOINT],
        };
        let json: Value = serde_json::to_value(joint_feedback_event(&feedback, 6)).unwrap();
        assert_eq!(json["type"], "joint_feedback");
        assert!(json["stime"].as_f64().unwrap() > 0.0);
        assert_eq!(json["position"].as_array().unwrap().len(), 6);
        assert_eq!(json["valid_fields"], 2);
    }

    #[test]
    fn test_status_event_decodes_tri_states() {
        let status = RobotStatus {
            drives_powered: 1,
            e_stopped: 0,
            error_code: 0,
            in_error: -1,
            in_motion: 0,
            mode: 2,
            motion_possible: 1,
        };
        let json: Value = serde_json::to_value(robot_status_event(&status)).unwrap();
        assert_eq!(json["drives_powered"], true);
        assert_eq!(json["e_stopped"], false);
        assert!(json["in_error"].is_null());
        assert_eq!(json["mode"], "auto");
    }

    #[test]
    fn test_motion_reply_event_names_result() {
        let reply = MotoMotionReply {
            groupno: 0,
            sequence: -1,
            command: 200121,
            result: -4,
            subcode: 5006,
            data: [0.0; ROS_MAX_JOINT],
        };
        let json: Value = serde_json::to_value(motion_reply_event("traj-mode start", &reply)).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["result"], "NotReady");
        assert_eq!(json["subcode"], "NotReadyServoOff");
        assert_eq!(json["reply"]["command"], 200121);
    }
}
