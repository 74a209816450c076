//! Modem transaction flows through the broker mailbox: HAL fallback,
//! canonical decoding, and the acknowledgement path.

#[cfg(test)]
mod tests {
    use crate::support::Harness;
    use broker_runtime::adapters::RilModemAck;
    use broker_runtime::wiring::{BrokerEvent, EventPump, EventRouter, ModemEvent};
    use parking_lot::Mutex;
    use ril_transaction::{
        CanonicalResponse, HalVersion, ModemPort, RadioError, RawPayload, RequestArgs,
        ResponseDispatcher, Serial, TransactionError, TransactionTable,
    };
    use shared_types::{AckResult, MessageIdAllocator};
    use sms_inbound::ModemAck;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    /// Modem mock that answers through the broker mailbox. Each request pops
    /// the next scripted radio error; an empty script means success.
    struct ScriptedModem {
        router: EventRouter,
        errors: Mutex<VecDeque<RadioError>>,
        sent: Mutex<Vec<(Serial, HalVersion, RequestArgs)>>,
    }

    impl ScriptedModem {
        fn new(router: EventRouter, errors: Vec<RadioError>) -> Self {
            Self {
                router,
                errors: Mutex::new(errors.into()),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<(Serial, HalVersion, RequestArgs)> {
            self.sent.lock().clone()
        }

        fn success_payload(hal_version: HalVersion, args: &RequestArgs) -> RawPayload {
            match args {
                RequestArgs::GetSmscAddress => RawPayload::SmscAddress("+100000".to_string()),
                RequestArgs::SendSms { .. } if hal_version >= HalVersion::V2_0 => {
                    RawPayload::SendSmsResult {
                        message_ref: 9,
                        ack_pdu: None,
                        error_code: None,
                    }
                }
                RequestArgs::SendSms { .. } => RawPayload::LegacySendSmsResult {
                    message_ref: 9,
                    ack_pdu_hex: None,
                    error_code: -1,
                },
                _ => RawPayload::Empty,
            }
        }
    }

    impl ModemPort for ScriptedModem {
        fn send_request(
            &self,
            serial: Serial,
            hal_version: HalVersion,
            args: &RequestArgs,
        ) -> Result<(), TransactionError> {
            self.sent.lock().push((serial, hal_version, args.clone()));
            let error = self
                .errors
                .lock()
                .pop_front()
                .unwrap_or(RadioError::None);
            let payload = match error {
                RadioError::None => Self::success_payload(hal_version, args),
                _ => RawPayload::Empty,
            };
            self.router.post_modem(ModemEvent::ResponseReady {
                serial,
                error,
                payload,
            });
            Ok(())
        }
    }

    struct Fixture {
        harness: Harness,
        router: EventRouter,
        rx: mpsc::UnboundedReceiver<BrokerEvent>,
        modem: Arc<ScriptedModem>,
        dispatcher: Arc<ResponseDispatcher<ScriptedModem>>,
    }

    impl Fixture {
        fn new(errors: Vec<RadioError>) -> Self {
            let (router, rx) = EventRouter::channel();
            let modem = Arc::new(ScriptedModem::new(router.clone(), errors));
            let dispatcher = Arc::new(ResponseDispatcher::new(
                Arc::new(TransactionTable::new()),
                Arc::clone(&modem),
                HalVersion::V2_0,
            ));
            Self {
                harness: Harness::new(),
                router,
                rx,
                modem,
                dispatcher,
            }
        }

        /// Route everything in the mailbox, including events the routing
        /// itself produced.
        fn drain(&mut self) {
            let pump = EventPump::new(
                Arc::clone(&self.harness.machine),
                Arc::clone(&self.dispatcher),
                Arc::new(MessageIdAllocator::new()),
            );
            while let Ok(event) = self.rx.try_recv() {
                pump.route(event);
            }
        }
    }

    #[tokio::test]
    async fn test_fallback_reissues_through_the_mailbox() {
        let mut fixture = Fixture::new(vec![RadioError::RequestNotSupported]);

        let completion = fixture.dispatcher.send(RequestArgs::SendSms {
            smsc: None,
            pdu: vec![0x2A],
        });
        fixture.drain();

        // The rejection at 2.0 was reissued under the 1.6 convention with a
        // fresh serial; the caller sees only the canonical success.
        let sent = fixture.modem.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].1, HalVersion::V2_0);
        assert_eq!(sent[1].1, HalVersion::V1_6);
        assert_ne!(sent[0].0, sent[1].0);

        assert_eq!(
            completion.await.unwrap(),
            Ok(CanonicalResponse::SmsSent {
                message_ref: 9,
                ack_pdu: None,
                error_code: None,
            })
        );
    }

    #[tokio::test]
    async fn test_smsc_query_round_trip() {
        let mut fixture = Fixture::new(Vec::new());

        let completion = fixture.dispatcher.send(RequestArgs::GetSmscAddress);
        fixture.drain();

        assert_eq!(
            completion.await.unwrap(),
            Ok(CanonicalResponse::SmscAddress("+100000".to_string()))
        );
    }

    #[tokio::test]
    async fn test_hard_radio_error_reaches_the_caller() {
        let mut fixture = Fixture::new(vec![RadioError::SystemErr]);

        let completion = fixture.dispatcher.send(RequestArgs::GetSmscAddress);
        fixture.drain();

        assert_eq!(
            completion.await.unwrap(),
            Err(TransactionError::Radio(RadioError::SystemErr))
        );
    }

    #[tokio::test]
    async fn test_acknowledgement_carries_result_disposition() {
        let fixture = Fixture::new(Vec::new());
        let ack = RilModemAck::new(Arc::clone(&fixture.dispatcher));

        ack.acknowledge(AckResult::Handled);
        ack.acknowledge(AckResult::Duplicated);
        ack.acknowledge(AckResult::DatabaseError);

        let sent = fixture.modem.sent();
        assert_eq!(sent.len(), 3);
        match &sent[0].2 {
            RequestArgs::AcknowledgeLastIncomingSms { success, .. } => assert!(*success),
            other => panic!("expected ack request, got {other:?}"),
        }
        // Duplicates are acknowledged as success so the network stops
        // retrying a message we already have.
        match &sent[1].2 {
            RequestArgs::AcknowledgeLastIncomingSms { success, .. } => assert!(*success),
            other => panic!("expected ack request, got {other:?}"),
        }
        match &sent[2].2 {
            RequestArgs::AcknowledgeLastIncomingSms { success, cause } => {
                assert!(!*success);
                // Memory-capacity-exceeded asks the SMSC to retry later.
                assert_eq!(*cause, 0xD3);
            }
            other => panic!("expected ack request, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reconnect_at_older_revision_rebinds_the_decoder() {
        let mut fixture = Fixture::new(Vec::new());

        fixture.router.post_modem(ModemEvent::Disconnected);
        fixture.router.post_modem(ModemEvent::Connected {
            hal_version: HalVersion::V1_5,
        });
        fixture.drain();
        assert_eq!(fixture.dispatcher.hal_version(), HalVersion::V1_5);

        let completion = fixture.dispatcher.send(RequestArgs::GetSmscAddress);
        fixture.drain();

        let sent = fixture.modem.sent();
        assert_eq!(sent.last().map(|(_, v, _)| *v), Some(HalVersion::V1_5));
        assert_eq!(
            completion.await.unwrap(),
            Ok(CanonicalResponse::SmscAddress("+100000".to_string()))
        );
    }
}
