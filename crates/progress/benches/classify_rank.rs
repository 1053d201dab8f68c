use chrono::{Duration, Utc};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

use seatwise_core::{MemberId, UnitId};
use seatwise_progress::{Classification, MemberRow, ProgressRecord, rank, summarize};

fn rows(n: usize) -> Vec<MemberRow> {
    let now = Utc::now();
    let unit = UnitId::new("bench-unit").unwrap();
    (0..n)
        .map(|i| {
            let record = ProgressRecord::new((i % 101) as f64, Some(now - Duration::days((i % 15) as i64)));
            let c = Classification::of(Some(&record), now - Duration::days(30), now, 7);
            MemberRow {
                member_id: MemberId::new(),
                display_name: format!("member {i}"),
                contact_address: format!("m{i}@example.com"),
                job_title: None,
                unit_id: unit.clone(),
                unit_title: "Bench".to_string(),
                current_module: None,
                completed_units: 0,
                total_units: 0,
                progress_percent: c.progress_percent,
                status: c.status,
                last_activity_at: record.last_activity_at,
                enrolled_at: now - Duration::days(30),
                days_since_enrollment: c.days_since_enrollment,
                data_unavailable: false,
            }
        })
        .collect()
}

fn bench_classify_rank(c: &mut Criterion) {
    let base = rows(10_000);
    c.bench_function("rank_and_summarize_10k", |b| {
        b.iter(|| {
            let mut rows = base.clone();
            rank(&mut rows);
            black_box(summarize(rows.len(), &rows))
        })
    });
}

criterion_group!(benches, bench_classify_rank);
criterion_main!(benches);
