mod advertise;
mod connack;
mod connect;
mod disconnect;
mod gwinfo;
mod puback;
mod pubcomp;
mod publish;
mod pubrec;
mod pubrel;
mod regack;
mod register;
mod searchgw;
mod suback;
mod subscribe;
mod unsuback;
mod unsubscribe;
mod util;
mod willmsg;
mod willmsgresp;
mod willmsgupd;
mod willtopic;
mod willtopicreq;
mod willtopicresp;
mod willtopicupd;
mod pingreq;
mod pingresp;
mod willmsgreq;

pub use advertise::AdvertiseMsg;
pub use connack::ConnAckMsg;
pub use connect::{ConnectMsg, PROTOCOL_ID};
pub use disconnect::DisconnectMsg;
pub use gwinfo::GwInfoMsg;
pub use pingreq::PingReqMsg;
pub use pingresp::PingRespMsg;
pub use puback::PubAckMsg;
pub use pubcomp::PubCompMsg;
pub use publish::PublishMsg;
pub use pubrec::PubRecMsg;
pub use pubrel::PubRelMsg;
pub use regack::RegAckMsg;
pub use register::RegisterMsg;
pub use searchgw::SearchGwMsg;
pub use suback::SubAckMsg;
pub use subscribe::SubscribeMsg;
pub use unsuback::UnsubAckMsg;
pub use unsubscribe::UnsubscribeMsg;
pub use willmsg::WillMsgMsg;
pub use willmsgreq::WillMsgReqMsg;
pub use willmsgresp::WillMsgRespMsg;
pub use willmsgupd::WillMsgUpdMsg;
pub use willtopic::WillTopicMsg;
pub use willtopicreq::WillTopicReqMsg;
pub use willtopicresp::WillTopicRespMsg;
pub use willtopicupd::WillTopicUpdMsg;
