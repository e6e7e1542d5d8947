use chrono::{DateTime, Duration, TimeZone, Utc};
use partner_metrics::import::{AppointmentImporter, RecordPayload};
use partner_metrics::metrics::identity::{key_for, INTERNAL_ROUTES_COMBINED};
use partner_metrics::metrics::{
    aggregate, Aggregator, OccurredAt, PartnerKey, RawRecord, RollupTable, Window,
    REFERENCE_TIMEZONE,
};

fn now() -> DateTime<Utc> {
    REFERENCE_TIMEZONE
        .with_ymd_and_hms(2025, 3, 12, 18, 30, 0)
        .single()
        .expect("valid now")
        .with_timezone(&Utc)
}

fn start_of_today() -> DateTime<Utc> {
    REFERENCE_TIMEZONE
        .with_ymd_and_hms(2025, 3, 12, 0, 0, 0)
        .single()
        .expect("valid midnight")
        .with_timezone(&Utc)
}

fn at(offset: Duration) -> OccurredAt {
    OccurredAt::At(now() - offset)
}

fn sample_records() -> Vec<RawRecord> {
    vec![
        RawRecord::new("Bob Smith ", "Sat", at(Duration::hours(1))),
        RawRecord::new(" Bob Smith", "Sold - Closed", at(Duration::hours(3))),
        RawRecord::new("Bob Smith", "Pending", at(Duration::days(3))).with_size_kw(7.5),
        RawRecord::new("Crew A", "Sit", at(Duration::days(2))).with_route("Internal - North"),
        RawRecord::new("Crew B", "closed", at(Duration::days(20))).with_route("internal"),
        RawRecord::new("MFSM", "Sat", at(Duration::hours(2))).with_route("Internal"),
        RawRecord::new("", "Sat", at(Duration::days(40))),
        RawRecord::new("Dana Cole", "No Show", OccurredAt::Unparseable("yesterday".into())),
        RawRecord::new("Dana Cole", "Sold", at(Duration::days(60))).with_sale_value(21_000.0),
        RawRecord::new("Evan Ruiz", "Sat", at(-Duration::hours(2))),
    ]
}

#[test]
fn counters_are_bounded_by_appointments() {
    let table = aggregate(&sample_records(), now());
    for metrics in &table {
        for window in Window::ordered() {
            let counters = metrics.window(window);
            assert!(
                counters.appointments >= counters.sat + counters.closed,
                "{} {:?}",
                metrics.key,
                window
            );
        }
    }
}

#[test]
fn reordering_records_does_not_change_the_table() {
    let records = sample_records();
    let forward = aggregate(&records, now());

    let mut reversed = records.clone();
    reversed.reverse();
    assert_eq!(aggregate(&reversed, now()), forward);

    let mut rotated = records;
    rotated.rotate_left(4);
    assert_eq!(aggregate(&rotated, now()), forward);
}

#[test]
fn aggregation_is_idempotent() {
    let records = sample_records();
    let first = Aggregator::default().aggregate(&records, now());
    let second = Aggregator::default().aggregate(&records, now());
    assert_eq!(first, second);
}

#[test]
fn partitions_merge_into_the_full_table() {
    let records = sample_records();
    let (left, right) = records.split_at(5);
    let merged = aggregate(left, now()).merge(aggregate(right, now()));
    assert_eq!(merged, aggregate(&records, now()));
}

#[test]
fn start_of_today_is_inclusive() {
    let boundary = start_of_today();
    let records = vec![
        RawRecord::new("Crew A", "Sat", OccurredAt::At(boundary)),
        RawRecord::new("Crew B", "Sat", OccurredAt::At(boundary - Duration::milliseconds(1))),
    ];
    let table = aggregate(&records, now());

    let crew_a = table.get(&key_for("Crew A")).expect("crew a present");
    let crew_b = table.get(&key_for("Crew B")).expect("crew b present");
    assert_eq!(crew_a.today.appointments, 1);
    assert_eq!(crew_b.today.appointments, 0);
    assert_eq!(crew_b.week.appointments, 1);
}

#[test]
fn whitespace_variants_share_a_partner() {
    let table = aggregate(&sample_records(), now());
    let bob = table.get(&key_for("Bob Smith")).expect("bob present");
    assert_eq!(bob.today.appointments, 2);
    assert_eq!(bob.today.sat, 1);
    assert_eq!(bob.today.closed, 1);
    assert_eq!(bob.week.appointments, 3);
    assert_eq!(bob.week.revenue_cents, 1_125_000);
}

#[test]
fn internal_routes_are_combined_except_exempt_partner() {
    let table = aggregate(&sample_records(), now());
    let combined = table
        .get(&PartnerKey::internal_routes())
        .expect("combined internal row");
    assert_eq!(combined.key.as_str(), INTERNAL_ROUTES_COMBINED);
    assert_eq!(combined.month_to_date.appointments, 1);
    assert_eq!(combined.year_to_date.appointments, 2);
    assert!(table.get(&key_for("Crew A")).is_none());

    let mfsm = table.get(&key_for("MFSM")).expect("mfsm keeps its own row");
    assert_eq!(mfsm.today.sat, 1);
}

#[test]
fn nothing_is_silently_dropped() {
    let outcome = Aggregator::default().aggregate(&sample_records(), now());
    let unknown = outcome
        .table
        .get(&PartnerKey::unknown())
        .expect("blank identity kept");
    assert_eq!(unknown.year_to_date.appointments, 1);

    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].partner, key_for("Dana Cole"));

    let evan = outcome.table.get(&key_for("Evan Ruiz")).expect("future record tracked");
    assert_eq!(evan.year_to_date.appointments, 0);
    assert!(!evan.has_activity_in_trailing_window);
}

#[test]
fn rates_use_one_decimal_and_guard_zero() {
    let mut records = Vec::new();
    for index in 0..10 {
        let status = match index {
            0..=6 => "Sat",
            7 | 8 => "Sold",
            _ => "Rescheduled",
        };
        records.push(RawRecord::new("Crew A", status, at(Duration::minutes(index))));
    }
    let table = aggregate(&records, now());
    let crew = table.get(&key_for("Crew A")).expect("crew present");

    assert_eq!(crew.today.appointments, 10);
    assert_eq!(crew.today.sat, 7);
    assert_eq!(crew.today.closed, 2);
    assert_eq!(crew.today.sit_rate(), 70.0);
    assert_eq!(crew.today.close_rate(), 28.6);

    let empty = RollupTable::new().totals(Window::Today);
    assert_eq!(empty.sit_rate(), 0.0);
    assert_eq!(empty.close_rate(), 0.0);
}

#[test]
fn absurd_sale_values_saturate_revenue() {
    let payloads: Vec<RecordPayload> = serde_json::from_str(
        r#"[
            {"partner":"Crew A","status":"Sold","sale_value":1e300,"created_on":"2025-03-12T12:00:00Z"},
            {"partner":"Crew A","status":"Sold","sale_value":1e300,"created_on":"2025-03-12T13:00:00Z"}
        ]"#,
    )
    .expect("payloads deserialize");
    let records = AppointmentImporter::new(REFERENCE_TIMEZONE).from_payloads(payloads);

    let table = aggregate(&records, now());
    let crew = table.get(&key_for("Crew A")).expect("crew present");
    assert_eq!(crew.today.appointments, 2);
    assert_eq!(crew.today.closed, 2);
    assert_eq!(crew.year_to_date.revenue_cents, u64::MAX);

    let doubled = table.clone().merge(table);
    assert_eq!(doubled.totals(Window::YearToDate).revenue_cents, u64::MAX);
}
