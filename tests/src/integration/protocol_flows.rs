//! # Protocol Flows
//!
//! Registry office traffic as seen from one service:
//!
//! 1. **init**: queue declarations, then a manual-ack consumer on the registry queue
//! 2. **request → answer**: a matching request raises one event; the answer
//!    lands on the registry queue as an `apiDescription`
//! 3. **garbage in**: non-JSON bodies raise one error and are discarded

#[cfg(test)]
mod tests {
    use std::time::Duration;
    use tokio::time::timeout;

    use registry_bus::{EventFilter, EventKind, RegistryEvent};
    use registry_client::testing::{BrokerCall, InMemoryBroker};
    use registry_types::{MessageType, ProtocolError, ProtocolMessage};
    use serde_json::json;

    use crate::integration::{invoicing_config, started_client};

    const WAIT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_init_declares_full_queue_set_and_consumes_registry_queue() {
        let broker = InMemoryBroker::new();
        let _client = started_client(&broker, invoicing_config()).await;

        assert_eq!(
            broker.calls(),
            vec![
                BrokerCall::Connect("amqp://localhost".into()),
                BrokerCall::CreateChannel,
                BrokerCall::AssertQueue { queue: "workflow".into(), durable: true },
                BrokerCall::AssertQueue { queue: "invoicing.registry".into(), durable: true },
                BrokerCall::AssertQueue { queue: "apiQ".into(), durable: true },
                BrokerCall::AssertQueue { queue: "regQ".into(), durable: true },
                BrokerCall::Consume { queue: "regQ".into(), no_ack: false },
            ]
        );
    }

    #[tokio::test]
    async fn test_matching_request_raises_one_event_and_one_ack() {
        let broker = InMemoryBroker::new();
        let client = started_client(&broker, invoicing_config()).await;
        let mut events = client.subscribe(EventFilter::all());

        let payload = json!({
            "type": "apiDescriptionRequest",
            "serviceName": "invoicing",
            "version": "1.0.0",
        });
        let tag = broker
            .deliver("regQ", serde_json::to_vec(&payload).unwrap())
            .unwrap();

        let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
        match event {
            RegistryEvent::ApiDescriptionRequest(request) => assert_eq!(request.raw, payload),
            other => panic!("unexpected event {other:?}"),
        }

        assert!(broker.wait_for_settlements(1).await);
        assert_eq!(broker.acks(), vec![tag]);
        assert!(broker.nacks().is_empty());
        assert!(events.drain().is_empty());
    }

    #[tokio::test]
    async fn test_request_answered_with_description() {
        let broker = InMemoryBroker::new();
        let client = started_client(&broker, invoicing_config()).await;
        let mut requests = client.subscribe(EventFilter::only(EventKind::ApiDescriptionRequest));

        broker
            .deliver(
                "regQ",
                br#"{"type":"apiDescriptionRequest","serviceName":"invoicing","version":"1.0.0","id":"req-7"}"#.to_vec(),
            )
            .unwrap();

        let request = match timeout(WAIT, requests.recv()).await.unwrap().unwrap() {
            RegistryEvent::ApiDescriptionRequest(request) => request,
            other => panic!("unexpected event {other:?}"),
        };
        assert_eq!(request.id.as_deref(), Some("req-7"));

        let description = json!({ "endpoints": [{ "method": "GET", "path": "/invoices/{id}" }] });
        let sent = client.send_api_description(&description).await.unwrap();

        let published = broker.published_to("regQ");
        assert_eq!(published.len(), 1);
        assert!(published[0].persistent);

        let decoded = ProtocolMessage::from_slice(&published[0].body).unwrap();
        assert_eq!(decoded, sent);
        assert_eq!(decoded.message_type, MessageType::ApiDescription);
        assert_eq!(decoded.description, Some(description));
    }

    #[tokio::test]
    async fn test_non_json_rejected_and_consumer_keeps_running() {
        let broker = InMemoryBroker::new();
        let client = started_client(&broker, invoicing_config()).await;
        let mut events = client.subscribe(EventFilter::all());

        let garbage = broker.deliver("regQ", vec![0xff, 0xfe, 0x00]).unwrap();

        match timeout(WAIT, events.recv()).await.unwrap().unwrap() {
            RegistryEvent::Error(ProtocolError::MessageParse { .. }) => {}
            other => panic!("unexpected event {other:?}"),
        }
        assert!(broker.wait_for_settlements(1).await);
        assert_eq!(broker.nacks(), vec![(garbage, false)]);
        assert_eq!(
            broker.count(|c| matches!(c, BrokerCall::Nack { multiple: false, requeue: false, .. })),
            1
        );

        let unrelated = broker
            .deliver("regQ", br#"{"type":"heartbeat","serviceName":"billing"}"#.to_vec())
            .unwrap();
        assert!(broker.wait_for_settlements(2).await);
        assert_eq!(broker.acks(), vec![unrelated]);
        assert!(events.drain().is_empty());
    }

    #[tokio::test]
    async fn test_requests_for_other_versions_ignored() {
        let broker = InMemoryBroker::new();
        let client = started_client(&broker, invoicing_config()).await;
        let mut requests = client.subscribe(EventFilter::only(EventKind::ApiDescriptionRequest));

        for version in ["0.9.0", "1.0", "1.0.0-beta", "1.0.0"] {
            let body = json!({
                "type": "apiDescriptionRequest",
                "serviceName": "invoicing",
                "version": version,
            });
            broker
                .deliver("regQ", serde_json::to_vec(&body).unwrap())
                .unwrap();
        }

        assert!(broker.wait_for_settlements(4).await);
        assert_eq!(broker.acks().len(), 4);

        let received = requests.drain();
        assert_eq!(received.len(), 1);
        match &received[0] {
            RegistryEvent::ApiDescriptionRequest(request) => assert_eq!(request.version, "1.0.0"),
            other => panic!("unexpected event {other:?}"),
        }
    }
}
