pub mod codec;
pub mod err;
pub mod flags;
pub mod frame;
pub mod msg;
pub mod qos;
pub mod return_code;
pub mod topic;

pub use frame::{decode_one, Message, MsgType};
