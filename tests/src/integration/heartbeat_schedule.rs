//! # Heartbeat Schedule
//!
//! Virtual-time checks of the heartbeat cadence: one send on start, one per
//! elapsed interval, none after stop. Timestamps on the wire strictly
//! increase and survive an ISO-8601 round trip.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use registry_bus::{EventFilter, EventKind, RegistryEvent};
    use registry_client::testing::{InMemoryBroker, ManualClock};
    use registry_client::RegistryClient;
    use registry_types::{ProtocolMessage, Timestamp};

    use crate::integration::{invoicing_config, started_client};

    fn heartbeats(broker: &InMemoryBroker) -> Vec<ProtocolMessage> {
        broker
            .published_to("apiQ")
            .iter()
            .map(|m| ProtocolMessage::from_slice(&m.body).unwrap())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_interval_yields_two_heartbeats() {
        let broker = InMemoryBroker::new();
        let client = started_client(&broker, invoicing_config()).await;

        client.start_heartbeat().await.unwrap();
        tokio::time::sleep(Duration::from_millis(5_000)).await;
        tokio::task::yield_now().await;

        assert_eq!(heartbeats(&broker).len(), 2);

        client.stop_heartbeat();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(heartbeats(&broker).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cadence_over_a_minute() {
        let broker = InMemoryBroker::new();
        let client = started_client(&broker, invoicing_config()).await;
        let mut sent = client.subscribe(EventFilter::only(EventKind::HeartbeatSent));

        client.start_heartbeat().await.unwrap();
        tokio::time::sleep(Duration::from_millis(60_500)).await;
        client.stop_heartbeat();

        // t = 0, 5, 10, ... 60
        let published = heartbeats(&broker);
        assert_eq!(published.len(), 13);

        let events: Vec<ProtocolMessage> = sent
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                RegistryEvent::HeartbeatSent(message) => Some(message),
                _ => None,
            })
            .collect();
        assert_eq!(events, published);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timestamps_strictly_increase_and_round_trip() {
        let broker = InMemoryBroker::new();
        // A frozen clock forces every timestamp through the monotonic bump
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let client =
            RegistryClient::with_clock(invoicing_config(), broker.connector(), clock).unwrap();
        client.init().await.unwrap();

        client.start_heartbeat().await.unwrap();
        for _ in 0..3 {
            client.send_heartbeat().await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(15_100)).await;
        client.stop_heartbeat();

        let raw: Vec<String> = broker
            .published_to("apiQ")
            .iter()
            .map(|m| m.json()["timestamp"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(raw.len(), 7);

        let parsed: Vec<Timestamp> = raw.iter().map(|s| Timestamp::parse(s).unwrap()).collect();
        for (text, ts) in raw.iter().zip(&parsed) {
            assert_eq!(&ts.to_iso8601(), text);
            assert!(text.ends_with('Z'));
        }
        assert!(parsed.windows(2).all(|w| w[0] < w[1]));

        let ids: std::collections::HashSet<_> = heartbeats(&broker).into_iter().map(|m| m.id).collect();
        assert_eq!(ids.len(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeats_continue_while_requests_flow() {
        let broker = InMemoryBroker::new();
        let client = started_client(&broker, invoicing_config()).await;
        client.start_heartbeat().await.unwrap();

        for _ in 0..5 {
            broker.deliver("regQ", b"not json".to_vec()).unwrap();
            broker
                .deliver(
                    "regQ",
                    br#"{"type":"apiDescriptionRequest","serviceName":"invoicing","version":"1.0.0"}"#.to_vec(),
                )
                .unwrap();
            tokio::time::sleep(Duration::from_millis(2_500)).await;
        }

        assert!(broker.wait_for_settlements(10).await);
        assert_eq!(broker.acks().len(), 5);
        assert_eq!(broker.nacks().len(), 5);
        // 12.5 s elapsed: t = 0, 5, 10
        assert_eq!(heartbeats(&broker).len(), 3);
        client.stop_heartbeat();
    }
}
