//! # Lifecycle
//!
//! Teardown and multi-service behavior:
//!
//! - `close` after `start_heartbeat` silences the timer and releases the
//!   channel and connection exactly once, and may be repeated
//! - several services sharing one broker only answer their own requests

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use registry_bus::{EventFilter, EventKind};
    use registry_client::testing::{BrokerCall, InMemoryBroker};
    use registry_client::{ClientState, RegistryClientConfig, RegistryError};
    use tokio_stream::StreamExt;

    use crate::integration::{invoicing_config, started_client};

    #[tokio::test(start_paused = true)]
    async fn test_close_after_start_heartbeat() {
        let broker = InMemoryBroker::new();
        let client = started_client(&broker, invoicing_config()).await;

        client.start_heartbeat().await.unwrap();
        tokio::time::sleep(Duration::from_millis(5_100)).await;
        assert_eq!(broker.published_to("apiQ").len(), 2);

        client.close().await.unwrap();
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(broker.published_to("apiQ").len(), 2);

        client.close().await.unwrap();
        assert_eq!(client.state(), ClientState::Closed);
        assert_eq!(broker.count(|c| *c == BrokerCall::CloseChannel), 1);
        assert_eq!(broker.count(|c| *c == BrokerCall::CloseConnection), 1);

        let calls = broker.calls();
        let channel_closed = calls.iter().position(|c| *c == BrokerCall::CloseChannel).unwrap();
        let connection_closed = calls.iter().position(|c| *c == BrokerCall::CloseConnection).unwrap();
        assert!(channel_closed < connection_closed);
    }

    #[tokio::test]
    async fn test_deliveries_after_close_are_not_consumed() {
        let broker = InMemoryBroker::new();
        let client = started_client(&broker, invoicing_config()).await;
        client.close().await.unwrap();

        assert!(!broker.has_consumer("regQ"));
        assert_eq!(broker.deliver("regQ", b"{}".to_vec()), None);
        assert!(matches!(
            client.send_api_description(&serde_json::json!({})).await,
            Err(RegistryError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_services_sharing_a_broker_answer_only_their_own_requests() {
        let broker = InMemoryBroker::new();

        let invoicing = started_client(
            &broker,
            RegistryClientConfig::new("amqp://localhost", "invoicing", "1.0.0")
                .with_registry_queue("invoicing-requests"),
        )
        .await;
        let billing = started_client(
            &broker,
            RegistryClientConfig::new("amqp://localhost", "billing", "2.1.0")
                .with_registry_queue("billing-requests"),
        )
        .await;

        let mut invoicing_requests =
            invoicing.subscribe(EventFilter::only(EventKind::ApiDescriptionRequest));
        let mut billing_requests =
            billing.subscribe(EventFilter::only(EventKind::ApiDescriptionRequest));

        let request = |service: &str, version: &str| {
            serde_json::to_vec(&serde_json::json!({
                "type": "apiDescriptionRequest",
                "serviceName": service,
                "version": version,
            }))
            .unwrap()
        };

        broker.deliver("invoicing-requests", request("invoicing", "1.0.0")).unwrap();
        broker.deliver("invoicing-requests", request("billing", "2.1.0")).unwrap();
        broker.deliver("billing-requests", request("billing", "2.1.0")).unwrap();
        broker.deliver("billing-requests", request("invoicing", "1.0.0")).unwrap();

        assert!(broker.wait_for_settlements(4).await);
        assert_eq!(broker.acks().len(), 4);
        assert_eq!(invoicing_requests.drain().len(), 1);
        assert_eq!(billing_requests.drain().len(), 1);

        // Both declare the shared default API queue
        assert_eq!(
            broker
                .declared_queues()
                .iter()
                .filter(|q| *q == "api_services_queue")
                .count(),
            2
        );

        invoicing.close().await.unwrap();
        billing.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_event_stream_ends_when_client_dropped() {
        let broker = InMemoryBroker::new();
        let client = started_client(&broker, invoicing_config()).await;
        let mut stream = client.events();

        client.send_heartbeat().await.unwrap();
        client.close().await.unwrap();
        drop(client);

        let first = stream.next().await.unwrap();
        assert_eq!(first.kind(), EventKind::HeartbeatSent);
        assert!(stream.next().await.is_none());
    }
}
