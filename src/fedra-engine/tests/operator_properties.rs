//! Property tests for the blocking operators against naive references.

use std::collections::HashMap;

use fedra_core::{Row, Value};
use fedra_engine::{
    BoxedOperator, ExecutionContext, HashAggregateExec, HashJoinExec,
    PhysicalOperator, SortExec, ValuesExec,
};
use fedra_logical::{AggCall, SortKey};
use proptest::prelude::*;

fn values(columns: &[&str], rows: &[Vec<i64>]) -> BoxedOperator {
    let rows = rows
        .iter()
        .map(|r| r.iter().copied().map(Value::Int64).collect())
        .collect();
    Box::new(ValuesExec::from_values(columns.iter().copied(), rows).unwrap())
}

/// Open, drain and close `op` on a fresh current-thread runtime.
fn run(mut op: BoxedOperator) -> Vec<Row> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    runtime.block_on(async move {
        let ctx = ExecutionContext::local();
        op.open(&ctx).await.unwrap();
        let mut rows = Vec::new();
        while let Some(row) = op.try_next().await.unwrap() {
            rows.push(row);
        }
        op.close().await.unwrap();
        rows
    })
}

fn int(v: &Value) -> i64 {
    match v {
        Value::Int64(i) => *i,
        other => panic!("expected integer, got {other:?}"),
    }
}

fn pairs() -> impl Strategy<Value = Vec<Vec<i64>>> {
    prop::collection::vec((0i64..5, -100i64..100).prop_map(|(k, v)| vec![k, v]), 0..40)
}

proptest! {
    #[test]
    fn sort_window_matches_stable_sort(
        rows in pairs(),
        offset in 0usize..10,
        fetch in prop::option::of(0usize..10),
    ) {
        let sort = SortExec::try_new(
            values(&["k", "v"], &rows),
            vec![SortKey::desc(0)],
            offset,
            fetch,
        )
        .unwrap();
        let actual: Vec<Vec<i64>> = run(Box::new(sort))
            .iter()
            .map(|r| r.values().iter().map(int).collect())
            .collect();

        let mut expected = rows.clone();
        expected.sort_by(|a, b| b[0].cmp(&a[0]));
        let expected: Vec<Vec<i64>> = expected
            .into_iter()
            .skip(offset)
            .take(fetch.unwrap_or(usize::MAX))
            .collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn hash_join_matches_nested_loop(left in pairs(), right in pairs()) {
        let join = HashJoinExec::try_new(
            values(&["a", "x"], &left),
            values(&["b", "y"], &right),
            vec![(0, 0)],
            None,
        )
        .unwrap();
        let joined = run(Box::new(join));

        let expected = left
            .iter()
            .map(|l| right.iter().filter(|r| r[0] == l[0]).count())
            .sum::<usize>();
        prop_assert_eq!(joined.len(), expected);
        for row in &joined {
            prop_assert_eq!(&row.values()[0], &row.values()[2]);
        }
    }

    #[test]
    fn hash_aggregate_matches_reference(rows in pairs()) {
        let aggregate = HashAggregateExec::try_new(
            values(&["k", "v"], &rows),
            vec![0],
            vec![
                AggCall::count_star("n"),
                AggCall::sum(1, "total"),
                AggCall::min(1, "lo"),
                AggCall::max(1, "hi"),
                AggCall::avg(1, "mean"),
            ],
        )
        .unwrap();
        let groups = run(Box::new(aggregate));

        let mut expected: HashMap<i64, (i64, i64, i64, i64)> = HashMap::new();
        for r in &rows {
            let entry = expected.entry(r[0]).or_insert((0, 0, i64::MAX, i64::MIN));
            entry.0 += 1;
            entry.1 += r[1];
            entry.2 = entry.2.min(r[1]);
            entry.3 = entry.3.max(r[1]);
        }

        prop_assert_eq!(groups.len(), expected.len());
        for g in &groups {
            let v = g.values();
            let want = expected[&int(&v[0])];
            prop_assert_eq!((int(&v[1]), int(&v[2]), int(&v[3]), int(&v[4])), want);
            let mean = match &v[5] {
                Value::Float64(f) => *f,
                other => panic!("expected float average, got {other:?}"),
            };
            let (count, sum, _, _) = want;
            prop_assert!((mean - sum as f64 / count as f64).abs() < 1e-9);
        }
    }
}
