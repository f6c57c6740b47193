//! Digital I/O reads and writes, addressed by controller I/O number

use super::{MessageBody, MsgType, WireReader, WireWriter};
use crate::error::FrameError;
use serde::Serialize;

/// Generates a body made of consecutive i32 fields.
macro_rules! int_body {
    ($(#[$meta:meta])* $name:ident, $msg_type:ident, $derive:ident { $($field:ident),+ }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, $derive)]
        pub struct $name {
            $(pub $field: i32,)+
        }

        impl $name {
            pub const SIZE: usize = 4 * [$(stringify!($field)),+].len();
        }

        impl MessageBody for $name {
            const MSG_TYPE: MsgType = MsgType::$msg_type;

            fn encode(&self, w: &mut WireWriter) {
                $(w.i32(self.$field);)+
            }

            fn decode(r: &mut WireReader<'_>) -> Result<Self, FrameError> {
                Ok(Self {
                    $($field: r.i32()?,)+
                })
            }
        }
    };
}

int_body!(MotoReadIoBit, MotoReadIoBit, Hash { address });
int_body!(MotoReadIoBitReply, MotoReadIoBitReply, Serialize { value, result_code });
int_body!(MotoWriteIoBit, MotoWriteIoBit, Hash { address, value });
int_body!(MotoWriteIoBitReply, MotoWriteIoBitReply, Serialize { result_code });
int_body!(MotoReadIoGroup, MotoReadIoGroup, Hash { address });
int_body!(MotoReadIoGroupReply, MotoReadIoGroupReply, Serialize { value, result_code });
int_body!(MotoWriteIoGroup, MotoWriteIoGroup, Hash { address, value });
int_body!(MotoWriteIoGroupReply, MotoWriteIoGroupReply, Serialize { result_code });
int_body!(
    /// Sent instead of the expected reply when an I/O request cannot be served
    MotoIoCtrlReply, MotoIoCtrlReply, Serialize { result_code, subcode }
);
