use mqttsn_core::msg::AdvertiseMsg;
use mqttsn_core::Message;

use crate::driver::GatewayDriver;

/// The gateway-wide periodic ADVERTISE beacon (component C8). Unlike a
/// [`crate::session::Session`], which is one per client, there is exactly
/// one `Gateway` per process; it owns no `SessionState` and shares nothing
/// with any session beyond the `gw_id` it broadcasts.
///
/// Driven by its own independent tick, scheduled via [`GatewayDriver`] the
/// same way a `Session` schedules its own — `program_tick` replaces any
/// previously outstanding request, so there is never more than one pending
/// timer for the advertiser either.
pub struct Gateway {
    gw_id: u8,
    advertise_period_s: u16,
}

impl Gateway {
    pub fn new(gw_id: u8, advertise_period_s: u16) -> Self {
        Self {
            gw_id,
            advertise_period_s,
        }
    }

    /// Call once at startup to emit the first beacon and arm the timer.
    pub fn start(&self, driver: &mut dyn GatewayDriver) {
        self.broadcast(driver);
    }

    /// Call when the gateway's tick fires; broadcasts and reprograms itself.
    pub fn on_tick(&self, driver: &mut dyn GatewayDriver) {
        self.broadcast(driver);
    }

    fn broadcast(&self, driver: &mut dyn GatewayDriver) {
        driver.broadcast(Message::Advertise(AdvertiseMsg::new(
            self.gw_id,
            self.advertise_period_s,
        )));
        driver.program_tick(u32::from(self.advertise_period_s) * 1000);
    }
}

#[cfg(test)]
mod gateway {
    use super::*;

    #[derive(Default)]
    struct RecordingDriver {
        broadcasts: Vec<Message>,
        ticks: Vec<u32>,
    }

    impl GatewayDriver for RecordingDriver {
        fn broadcast(&mut self, msg: Message) {
            self.broadcasts.push(msg);
        }
        fn program_tick(&mut self, ms: u32) {
            self.ticks.push(ms);
        }
    }

    #[test]
    fn start_emits_one_beacon_and_arms_the_timer() {
        let gateway = Gateway::new(7, 60);
        let mut driver = RecordingDriver::default();

        gateway.start(&mut driver);

        assert_eq!(driver.broadcasts.len(), 1);
        assert!(matches!(
            driver.broadcasts[0],
            Message::Advertise(AdvertiseMsg { gw_id: 7, duration_s: 60 })
        ));
        assert_eq!(driver.ticks, vec![60_000]);
    }

    #[test]
    fn each_tick_rebroadcasts_and_rearms() {
        let gateway = Gateway::new(1, 30);
        let mut driver = RecordingDriver::default();

        gateway.on_tick(&mut driver);
        gateway.on_tick(&mut driver);

        assert_eq!(driver.broadcasts.len(), 2);
        assert_eq!(driver.ticks, vec![30_000, 30_000]);
    }
}
