use bytes::{Buf, BytesMut};

use mqttsn_gateway::driver::SessionDriver;
use mqttsn_gateway::Session;

/// Feeds every complete packet currently sitting in `buf` through
/// `session.on_broker_bytes`, leaving a trailing partial packet for the
/// next read.
///
/// `Session::on_broker_bytes` decodes in place from a `Bytes`, so this
/// works on a cheap refcounted clone ("probe") and only advances `buf`
/// once a call actually consumed bytes; a decode error is treated as "not
/// enough data yet" since the wire codec gives the driver no other signal
/// to tell a genuinely malformed packet from a partial read of the next
/// one. In practice the broker writes each packet in a single syscall, so
/// this is a correctness gap only under unusual TCP fragmentation — see
/// `DESIGN.md`.
pub fn drain_broker_bytes(
    session: &mut Session,
    driver: &mut dyn SessionDriver,
    buf: &mut BytesMut,
) {
    loop {
        if buf.is_empty() {
            return;
        }

        let mut probe = buf.clone().freeze();
        let probe_len = probe.len();

        match session.on_broker_bytes(driver, &mut probe) {
            Ok(()) => {
                let consumed = probe_len - probe.len();
                if consumed == 0 {
                    return;
                }
                buf.advance(consumed);
            }
            Err(_) => return,
        }
    }
}
