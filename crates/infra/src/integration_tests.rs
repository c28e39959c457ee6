//! End-to-end tests: service → dispatcher → event store → replica.
//!
//! Verifies:
//! - committed commands update the ledger and the audit log together
//! - a failed append leaves no trace
//! - concurrent writers sharing a store are detected
//! - observers are read-only and pinned to their warehouse

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use stockroom_audit::{AuditKind, LegacyHistory};
    use stockroom_auth::{AuthzError, Principal};
    use stockroom_core::{
        Actor, AggregateId, DeviceModelId, DomainError, ExpectedVersion, ManufacturerId, UserId,
        WarehouseId,
    };
    use stockroom_inventory::{
        DashboardFilter, DeviceDetails, PartDetails, SameWarehouseMove, TimelineCategory,
    };

    use crate::command_dispatcher::{CommandDispatcher, DispatchError};
    use crate::event_store::{
        EventStore, EventStoreError, InMemoryEventStore, StoredEvent, UncommittedEvent,
    };
    use crate::service::InventoryService;

    /// Store whose appends can be switched to fail.
    #[derive(Default)]
    struct FlakyStore {
        inner: InMemoryEventStore,
        failing: AtomicBool,
    }

    impl EventStore for FlakyStore {
        fn append(
            &self,
            events: Vec<UncommittedEvent>,
            expected_version: ExpectedVersion,
        ) -> Result<Vec<StoredEvent>, EventStoreError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(EventStoreError::Unavailable("disk full".to_string()));
            }
            self.inner.append(events, expected_version)
        }

        fn load_stream(&self, stream_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
            self.inner.load_stream(stream_id)
        }
    }

    struct Site {
        warehouse: WarehouseId,
        other_warehouse: WarehouseId,
        manufacturer: ManufacturerId,
        model: DeviceModelId,
    }

    fn operator() -> Principal {
        Principal::operator(Actor::new(UserId::new(), "alice"))
    }

    fn service<S: EventStore>(store: S, stream_id: AggregateId) -> InventoryService<S> {
        let dispatcher = CommandDispatcher::open(store, stream_id, SameWarehouseMove::Record).unwrap();
        InventoryService::new(dispatcher, LegacyHistory::MatchSerial)
    }

    fn seed<S: EventStore>(svc: &InventoryService<S>, op: &Principal) -> Site {
        let warehouse = svc.register_warehouse(op, "Main").unwrap();
        let other_warehouse = svc.register_warehouse(op, "Annex").unwrap();
        let manufacturer = svc.register_manufacturer(op, "Dell").unwrap();
        let model = svc.register_device_model(op, manufacturer, "Latitude 5420").unwrap();
        Site {
            warehouse,
            other_warehouse,
            manufacturer,
            model,
        }
    }

    fn laptop(site: &Site, serial: &str) -> DeviceDetails {
        DeviceDetails::new(site.manufacturer, site.model, serial).in_warehouse(site.warehouse)
    }

    #[test]
    fn committed_commands_update_state_and_audit_log_together() {
        let svc = service(InMemoryEventStore::new(), AggregateId::new());
        let op = operator();
        let site = seed(&svc, &op);

        let device = svc.intake_device(&op, laptop(&site, "SN-1")).unwrap();
        svc.checkout_device(&op, device, "ACME", "T-7").unwrap();

        let dashboard = svc.dashboard(&op, &DashboardFilter::default()).unwrap();
        assert_eq!(dashboard.devices.len(), 1);
        assert!(dashboard.devices[0].loaned);
        assert_eq!(dashboard.loans.len(), 1);

        let log = svc.audit_log(&op).unwrap();
        let kinds: Vec<AuditKind> = log.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![AuditKind::Loan, AuditKind::Create]);
        assert!(log.iter().all(|e| e.actor.as_ref() == Some(&op.actor)));
    }

    #[test]
    fn failed_append_leaves_no_trace() {
        let store = Arc::new(FlakyStore::default());
        let svc = service(store.clone(), AggregateId::new());
        let op = operator();
        let site = seed(&svc, &op);
        let version_before = svc.dispatcher().version().unwrap();

        store.failing.store(true, Ordering::SeqCst);
        let err = svc.intake_device(&op, laptop(&site, "SN-1")).unwrap_err();
        assert!(matches!(err, DispatchError::Persistence(EventStoreError::Unavailable(_))));

        assert_eq!(svc.dispatcher().version().unwrap(), version_before);
        assert!(svc.audit_log(&op).unwrap().is_empty());
        let dashboard = svc.dashboard(&op, &DashboardFilter::default()).unwrap();
        assert!(dashboard.devices.is_empty());

        store.failing.store(false, Ordering::SeqCst);
        svc.intake_device(&op, laptop(&site, "SN-1")).unwrap();
        assert_eq!(svc.audit_log(&op).unwrap().len(), 1);
    }

    #[test]
    fn concurrent_writer_is_detected_and_replica_reloaded() {
        let store = Arc::new(InMemoryEventStore::new());
        let stream = AggregateId::new();
        let a = service(store.clone(), stream);
        let op = operator();
        let site = seed(&a, &op);
        let b = service(store.clone(), stream);

        a.intake_device(&op, laptop(&site, "SN-A")).unwrap();

        let err = b.intake_device(&op, laptop(&site, "SN-B")).unwrap_err();
        assert!(matches!(err, DispatchError::Concurrency(_)));

        // The loser reloaded and sees the winner's device; resubmitting works.
        let seen = b.dashboard(&op, &DashboardFilter::default()).unwrap();
        assert_eq!(seen.devices.len(), 1);
        b.intake_device(&op, laptop(&site, "SN-B")).unwrap();

        // And the reload also made the duplicate-serial rule see across writers.
        let err = b.intake_device(&op, laptop(&site, "SN-A")).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Domain(DomainError::DuplicateSerial(_))
        ));
    }

    #[test]
    fn reopening_replays_the_same_ledger() {
        let store = Arc::new(InMemoryEventStore::new());
        let stream = AggregateId::new();
        let op = operator();

        let first = service(store.clone(), stream);
        let site = seed(&first, &op);
        let device = first.intake_device(&op, laptop(&site, "SN-1")).unwrap();
        first.move_device(&op, device, site.other_warehouse).unwrap();
        first
            .hand_off_device(&op, device, Some("ACME"), Some("T-1"), "sold")
            .unwrap();

        let second = service(store, stream);
        assert_eq!(
            second.dashboard(&op, &DashboardFilter::default()).unwrap(),
            first.dashboard(&op, &DashboardFilter::default()).unwrap()
        );
        assert_eq!(second.audit_log(&op).unwrap(), first.audit_log(&op).unwrap());
        assert_eq!(
            second.dispatcher().version().unwrap(),
            first.dispatcher().version().unwrap()
        );
    }

    #[test]
    fn refresh_picks_up_other_writers() {
        let store = Arc::new(InMemoryEventStore::new());
        let stream = AggregateId::new();
        let op = operator();
        let writer = service(store.clone(), stream);
        let reader = service(store, stream);

        let site = seed(&writer, &op);
        writer.intake_device(&op, laptop(&site, "SN-1")).unwrap();

        assert!(reader.dashboard(&op, &DashboardFilter::default()).unwrap().devices.is_empty());
        reader.dispatcher().refresh().unwrap();
        assert_eq!(reader.dashboard(&op, &DashboardFilter::default()).unwrap().devices.len(), 1);
    }

    #[test]
    fn observers_cannot_mutate() {
        let svc = service(InMemoryEventStore::new(), AggregateId::new());
        let op = operator();
        let site = seed(&svc, &op);
        let observer = Principal::observer(Actor::new(UserId::new(), "bob"), Some(site.warehouse));

        let err = svc.intake_device(&observer, laptop(&site, "SN-1")).unwrap_err();
        assert!(matches!(err, DispatchError::Forbidden(AuthzError::Forbidden(_))));
        assert!(matches!(
            svc.audit_log(&observer).unwrap_err(),
            DispatchError::Forbidden(_)
        ));
        assert!(matches!(
            svc.export_inventory(&observer).unwrap_err(),
            DispatchError::Forbidden(_)
        ));
        assert_eq!(svc.dispatcher().version().unwrap(), 4);
    }

    #[test]
    fn observer_dashboard_is_pinned_to_assigned_warehouse() {
        let svc = service(InMemoryEventStore::new(), AggregateId::new());
        let op = operator();
        let site = seed(&svc, &op);
        svc.intake_device(&op, laptop(&site, "SN-MAIN")).unwrap();
        svc.intake_device(
            &op,
            laptop(&site, "SN-ANNEX").in_warehouse(site.other_warehouse),
        )
        .unwrap();
        svc.intake_part(
            &op,
            PartDetails {
                quantity: 3,
                warehouse: Some(site.other_warehouse),
                ..PartDetails::default()
            },
        )
        .unwrap();

        let observer = Principal::observer(Actor::new(UserId::new(), "bob"), Some(site.warehouse));
        let asked_for_annex = DashboardFilter::default().in_warehouse(site.other_warehouse);
        let seen = svc.dashboard(&observer, &asked_for_annex).unwrap();

        assert_eq!(seen.devices.len(), 1);
        assert_eq!(seen.devices[0].serial_number, "SN-MAIN");
        assert!(seen.parts.is_empty());
    }

    #[test]
    fn observer_without_warehouse_sees_nothing() {
        let svc = service(InMemoryEventStore::new(), AggregateId::new());
        let op = operator();
        let site = seed(&svc, &op);
        let device = svc.intake_device(&op, laptop(&site, "SN-1")).unwrap();

        let observer = Principal::observer(Actor::new(UserId::new(), "bob"), None);
        let seen = svc.dashboard(&observer, &DashboardFilter::default()).unwrap();
        assert!(seen.devices.is_empty());
        assert!(matches!(
            svc.device_timeline(&observer, device).unwrap_err(),
            DispatchError::Domain(DomainError::NotFound { .. })
        ));
    }

    #[test]
    fn observer_timeline_is_limited_to_their_warehouse() {
        let svc = service(InMemoryEventStore::new(), AggregateId::new());
        let op = operator();
        let site = seed(&svc, &op);
        let mine = svc.intake_device(&op, laptop(&site, "SN-MINE")).unwrap();
        let theirs = svc
            .intake_device(&op, laptop(&site, "SN-THEIRS").in_warehouse(site.other_warehouse))
            .unwrap();

        let observer = Principal::observer(Actor::new(UserId::new(), "bob"), Some(site.warehouse));
        let timeline = svc.device_timeline(&observer, mine).unwrap();
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline[0].category, TimelineCategory::Audit(AuditKind::Create));

        assert!(svc.device_timeline(&observer, theirs).is_err());
    }

    #[test]
    fn timeline_covers_loans_transfers_and_audit() {
        let svc = service(InMemoryEventStore::new(), AggregateId::new());
        let op = operator();
        let site = seed(&svc, &op);
        let device = svc.intake_device(&op, laptop(&site, "SN-1")).unwrap();
        svc.move_device(&op, device, site.other_warehouse).unwrap();
        let loan = svc.checkout_device(&op, device, "ACME", "T-9").unwrap();
        svc.return_loan(&op, loan).unwrap();

        let timeline = svc.device_timeline(&op, device).unwrap();
        let transfers = timeline
            .iter()
            .filter(|e| e.category == TimelineCategory::Transfer)
            .count();
        let audits = timeline
            .iter()
            .filter(|e| matches!(e.category, TimelineCategory::Audit(_)))
            .count();

        assert_eq!(transfers, 1);
        // CREATE, TRANSFER, LOAN, RETURN
        assert_eq!(audits, 4);
        // The returned loan is gone, so no loan row remains.
        assert!(timeline.iter().all(|e| e.category != TimelineCategory::Loan));
    }

    #[test]
    fn part_flow_through_the_service() {
        let svc = service(InMemoryEventStore::new(), AggregateId::new());
        let op = operator();
        let site = seed(&svc, &op);
        let details = PartDetails {
            serial_number: Some("P-1".to_string()),
            quantity: 5,
            warehouse: Some(site.warehouse),
            ..PartDetails::default()
        };
        let part = svc.intake_part(&op, details.clone()).unwrap();
        svc.intake_part(&op, details).unwrap();

        svc.restock_part(&op, part, 2).unwrap();
        let fragment = svc.hand_off_part(&op, part, 3, "ACME", Some("T-2"), "").unwrap();
        assert_ne!(fragment, part);

        let dashboard = svc.dashboard(&op, &DashboardFilter::default()).unwrap();
        assert_eq!(dashboard.handed_off_parts.len(), 1);
        assert_eq!(dashboard.handed_off_parts[0].quantity, 3);

        assert!(matches!(
            svc.restock_part(&op, part, 0).unwrap_err(),
            DispatchError::Domain(DomainError::InvalidAmount(0))
        ));

        assert_eq!(svc.deduplicate_part_serials(&op).unwrap(), 1);
        assert_eq!(svc.deduplicate_part_serials(&op).unwrap(), 0);
    }

    #[test]
    fn audit_notes_are_searchable() {
        let svc = service(InMemoryEventStore::new(), AggregateId::new());
        let op = operator();
        svc.append_audit_note(&op, AuditKind::Update, "Imported row for SN-OLD")
            .unwrap();

        assert_eq!(svc.search_audit_log(&op, "sn-old").unwrap().len(), 1);
        assert!(svc.search_audit_log(&op, "nothing").unwrap().is_empty());
        assert_eq!(svc.export_audit_log(&op).unwrap().len(), 1);
    }

    #[test]
    fn restore_assigns_a_new_identity() {
        let svc = service(InMemoryEventStore::new(), AggregateId::new());
        let op = operator();
        let site = seed(&svc, &op);
        let device = svc.intake_device(&op, laptop(&site, "SN-1")).unwrap();
        svc.hand_off_device(&op, device, Some("ACME"), None, "").unwrap();

        let restored = svc.restore_device(&op, device).unwrap();
        assert_ne!(restored, device);

        let dashboard = svc.dashboard(&op, &DashboardFilter::default()).unwrap();
        assert_eq!(dashboard.devices.len(), 1);
        assert_eq!(dashboard.devices[0].id, restored);
        assert!(dashboard.archive.is_empty());
    }
}
