//! Per-device history: loans, transfers and audit entries merged into one timeline.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_audit::{AuditKind, AuditLog, LegacyHistory};
use stockroom_core::{DeviceId, DomainError, DomainResult};

use crate::Ledger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimelineCategory {
    Loan,
    Transfer,
    Audit(AuditKind),
}

impl core::fmt::Display for TimelineCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TimelineCategory::Loan => f.write_str("Loan"),
            TimelineCategory::Transfer => f.write_str("Transfer"),
            TimelineCategory::Audit(kind) => write!(f, "Log: {kind}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub at: DateTime<Utc>,
    pub category: TimelineCategory,
    pub description: String,
}

/// Build the history of a live or archived device, newest first.
///
/// A restored device keeps the history of the identities it had before.
///
/// Loans are dated at midnight UTC of their loan day. Items with equal
/// timestamps keep the order loans, transfers, audit entries.
pub fn build_timeline(
    ledger: &Ledger,
    audit: &AuditLog,
    device_id: DeviceId,
    legacy: LegacyHistory,
) -> DomainResult<Vec<TimelineEvent>> {
    let record = ledger
        .device_record(device_id)
        .ok_or_else(|| DomainError::not_found("device", device_id))?;
    let catalog = ledger.catalog();
    let lineage = ledger.device_lineage(device_id);

    let mut timeline: Vec<TimelineEvent> = ledger
        .loans()
        .filter(|l| lineage.contains(&l.device_id))
        .map(|l| TimelineEvent {
            at: l.loaned_on.and_time(NaiveTime::MIN).and_utc(),
            category: TimelineCategory::Loan,
            description: format!("For {}, ticket: {}", l.client_name, l.ticket_number),
        })
        .collect();

    timeline.extend(
        ledger
            .transfers()
            .iter()
            .filter(|t| lineage.contains(&t.device_id))
            .map(|t| TimelineEvent {
                at: t.moved_at,
                category: TimelineCategory::Transfer,
                description: format!(
                    "{} -> {}",
                    catalog.warehouse_name(t.source),
                    catalog.warehouse_name(Some(t.destination))
                ),
            }),
    );

    timeline.extend(
        audit
            .for_device(&lineage, record.serial_number(), legacy)
            .into_iter()
            .map(|e| TimelineEvent {
                at: e.recorded_at,
                category: TimelineCategory::Audit(e.kind),
                description: e.description.clone(),
            }),
    );

    timeline.sort_by(|a, b| b.at.cmp(&a.at));
    Ok(timeline)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use stockroom_audit::{AuditEntry, AuditRecord, AuditSubject};
    use stockroom_core::{
        Actor, AggregateId, AuditEntryId, DeviceModelId, LoanId, ManufacturerId, TransferId,
        UserId, WarehouseId,
    };
    use stockroom_events::execute;

    use super::*;
    use crate::{DeviceDetails, LedgerAction, LedgerCommand};

    fn day(month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, month, day, 10, 0, 0).unwrap()
    }

    fn run(ledger: &mut Ledger, at: DateTime<Utc>, action: LedgerAction) {
        let actor = Some(Actor::new(UserId::new(), "anna"));
        execute(ledger, &LedgerCommand::new(actor, at, action)).unwrap();
    }

    /// Run `action` and record the audit entries it produces.
    fn logged(ledger: &mut Ledger, audit: &mut AuditLog, at: DateTime<Utc>, action: LedgerAction) {
        let command = LedgerCommand::new(None, at, action);
        for event in execute(ledger, &command).unwrap() {
            if let Some(record) = event.audit {
                audit.append(AuditEntry::from_record(AuditEntryId::new(), record, at, None));
            }
        }
    }

    fn seeded() -> (Ledger, DeviceId, WarehouseId) {
        let mut ledger = Ledger::empty(AggregateId::new());
        let main = WarehouseId::new();
        let annex = WarehouseId::new();
        let acme = ManufacturerId::new();
        let x1 = DeviceModelId::new();
        let device_id = DeviceId::new();
        let t0 = day(1, 1);
        run(&mut ledger, t0, LedgerAction::RegisterWarehouse { warehouse_id: main, name: "Main".into() });
        run(&mut ledger, t0, LedgerAction::RegisterWarehouse { warehouse_id: annex, name: "Annex".into() });
        run(&mut ledger, t0, LedgerAction::RegisterManufacturer { manufacturer_id: acme, name: "Acme".into() });
        run(
            &mut ledger,
            t0,
            LedgerAction::RegisterDeviceModel { model_id: x1, manufacturer_id: acme, name: "X1".into() },
        );
        run(
            &mut ledger,
            t0,
            LedgerAction::IntakeDevice {
                device_id,
                details: DeviceDetails::new(acme, x1, "SN-42").in_warehouse(main),
            },
        );
        (ledger, device_id, annex)
    }

    #[test]
    fn merges_loan_transfer_and_audit_newest_first() {
        let (mut ledger, device_id, annex) = seeded();
        run(
            &mut ledger,
            day(1, 1),
            LedgerAction::CheckoutDevice {
                loan_id: LoanId::new(),
                device_id,
                client_name: "ACME".into(),
                ticket_number: "T-1".into(),
            },
        );
        run(
            &mut ledger,
            day(2, 1),
            LedgerAction::MoveDevice { device_id, transfer_id: TransferId::new(), destination: annex },
        );

        let mut audit = AuditLog::new();
        audit.append(AuditEntry::from_record(
            AuditEntryId::new(),
            AuditRecord::new(AuditKind::Update, AuditSubject::Unreferenced, "checked SN-42 battery"),
            day(3, 1),
            None,
        ));

        let timeline = build_timeline(&ledger, &audit, device_id, LegacyHistory::MatchSerial).unwrap();

        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline[0].category, TimelineCategory::Audit(AuditKind::Update));
        assert_eq!(timeline[1].category, TimelineCategory::Transfer);
        assert_eq!(timeline[1].description, "Main -> Annex");
        assert_eq!(timeline[2].category, TimelineCategory::Loan);
        assert_eq!(timeline[2].at, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(timeline[2].description, "For ACME, ticket: T-1");
    }

    #[test]
    fn excluded_legacy_entries_stay_out() {
        let (ledger, device_id, _) = seeded();
        let mut audit = AuditLog::new();
        audit.append(AuditEntry::from_record(
            AuditEntryId::new(),
            AuditRecord::new(AuditKind::Loan, AuditSubject::Unreferenced, "old SN-42 loan"),
            day(3, 1),
            None,
        ));
        audit.append(AuditEntry::from_record(
            AuditEntryId::new(),
            AuditRecord::new(AuditKind::Create, AuditSubject::Device(device_id), "CREATE"),
            day(1, 1),
            None,
        ));

        let timeline = build_timeline(&ledger, &audit, device_id, LegacyHistory::Exclude).unwrap();
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline[0].category, TimelineCategory::Audit(AuditKind::Create));
    }

    #[test]
    fn restored_device_keeps_its_earlier_history() {
        let (mut ledger, device_id, annex) = seeded();
        let template = ledger.device(device_id).unwrap().clone();
        let mut audit = AuditLog::new();
        let original = DeviceId::new();
        let restored = DeviceId::new();

        logged(
            &mut ledger,
            &mut audit,
            day(1, 2),
            LedgerAction::IntakeDevice {
                device_id: original,
                details: DeviceDetails::new(template.manufacturer, template.model, "SN-9"),
            },
        );
        logged(
            &mut ledger,
            &mut audit,
            day(2, 1),
            LedgerAction::MoveDevice { device_id: original, transfer_id: TransferId::new(), destination: annex },
        );
        logged(
            &mut ledger,
            &mut audit,
            day(3, 1),
            LedgerAction::HandOffDevice {
                device_id: original,
                client_name: Some("ACME".into()),
                ticket_number: None,
                notes: String::new(),
            },
        );
        logged(
            &mut ledger,
            &mut audit,
            day(4, 1),
            LedgerAction::RestoreDevice { archived_id: original, device_id: restored },
        );

        assert_eq!(ledger.device_lineage(restored), vec![restored, original]);
        let timeline = build_timeline(&ledger, &audit, restored, LegacyHistory::Exclude).unwrap();
        let categories: Vec<TimelineCategory> = timeline.iter().map(|e| e.category).collect();
        assert_eq!(
            categories,
            vec![
                TimelineCategory::Audit(AuditKind::Restore),
                TimelineCategory::Audit(AuditKind::HandoffDevice),
                TimelineCategory::Transfer,
                TimelineCategory::Audit(AuditKind::Transfer),
                TimelineCategory::Audit(AuditKind::Create),
            ]
        );
    }

    #[test]
    fn unknown_device_is_not_found() {
        let (ledger, _, _) = seeded();
        let err = build_timeline(&ledger, &AuditLog::new(), DeviceId::new(), LegacyHistory::default())
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "device", .. }));
    }
}
