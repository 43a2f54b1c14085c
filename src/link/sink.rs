//! Trait abstraction for the traffic tracker fed by the receiver

use crate::legacy::record::AircraftStateRecord;

/// Consumer of freshly decoded records
#[cfg_attr(test, mockall::automock)]
pub trait TrafficSink: Send {
    /// Take ownership of one decoded record
    fn deliver(&mut self, record: AircraftStateRecord);
}

/// Collects records in memory
impl TrafficSink for Vec<AircraftStateRecord> {
    fn deliver(&mut self, record: AircraftStateRecord) {
        self.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legacy::record::AddressType;

    #[test]
    fn test_vec_sink_collects_in_order() {
        let mut sink: Vec<AircraftStateRecord> = Vec::new();
        sink.deliver(AircraftStateRecord::new(1, AddressType::Icao));
        sink.deliver(AircraftStateRecord::new(2, AddressType::Flarm));

        assert_eq!(sink.len(), 2);
        assert_eq!(sink[0].address, 1);
        assert_eq!(sink[1].key(), (2, AddressType::Flarm));
    }

    #[test]
    fn test_mock_sink_expectation() {
        let mut sink = MockTrafficSink::new();
        sink.expect_deliver()
            .withf(|record| record.address == 0x4242)
            .times(1)
            .return_const(());

        sink.deliver(AircraftStateRecord::new(0x4242, AddressType::Random));
    }
}
