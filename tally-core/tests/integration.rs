//! Integration Tests for the Recomputation Engine
//!
//! These tests verify that inputs, memos and the derivation graph work
//! together correctly through the session API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use tally_core::data::{stats, Predicate};
use tally_core::render::{ChartKind, ChartSpec, Frame, RecordingSink, RenderSink, Severity, View};
use tally_core::{ComputeError, Session, TallyError, Value};

/// Counts calls of a computation.
fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    (count.clone(), count)
}

/// Sink handle that stays readable after being attached to a session.
#[derive(Clone, Default)]
struct Shared(Arc<Mutex<RecordingSink>>);

impl RenderSink for Shared {
    fn render(&mut self, frame: &Frame<'_>) {
        self.0.lock().render(frame);
    }
}

fn mean_session(calls: Arc<AtomicUsize>) -> Session {
    let mut session = Session::default();
    session.declare("sales", vec![100.0, 200.0, 300.0]).unwrap();
    session
        .add_node("mean_sales", ["sales"], move |args| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Float(stats::mean(&args.get("sales")?.numbers()?)?))
        })
        .unwrap();
    session
}

/// Input sales = [100, 200, 300], then [100, 200, 300, 400].
#[test]
fn mean_of_sales_scenario() {
    let (calls, calls_clone) = counter();
    let mut session = mean_session(calls_clone);

    assert_eq!(*session.evaluate("mean_sales").unwrap(), Value::Float(200.0));

    session
        .stage("sales", vec![100.0, 200.0, 300.0, 400.0])
        .unwrap();
    assert_eq!(*session.evaluate("mean_sales").unwrap(), Value::Float(250.0));

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

/// Two evaluations without a write in between return the same object and
/// call the computation once.
#[test]
fn evaluation_is_idempotent() {
    let (calls, calls_clone) = counter();
    let mut session = mean_session(calls_clone);

    let first = session.evaluate("mean_sales").unwrap();
    let second = session.evaluate("mean_sales").unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(session.graph().stats("mean_sales").unwrap().hits, 1);
}

/// Writing an equal value still invalidates the cache.
#[test]
fn equal_write_is_a_cache_miss() {
    let (calls, calls_clone) = counter();
    let mut session = mean_session(calls_clone);

    session.evaluate("mean_sales").unwrap();
    session.set("sales", vec![100.0, 200.0, 300.0]).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // the pass itself brought the memo up to date
    session.evaluate("mean_sales").unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn cycle_is_rejected_at_construction() {
    let mut session = Session::default();
    session
        .add_node("B", ["A"], |args| Ok(args.at(0)?.clone()))
        .unwrap();
    let err = session
        .add_node("A", ["B"], |args| Ok(args.at(0)?.clone()))
        .unwrap_err();
    assert!(matches!(err, TallyError::CycleDetected { .. }));
    assert!(err.is_construction_error());
}

/// Every node is evaluated after its dependencies, and sees their values for
/// the current input versions.
#[test]
fn recompute_respects_topological_order() {
    let order = Arc::new(Mutex::new(Vec::<String>::new()));
    let mut session = Session::default();
    session.declare("x", 1i64).unwrap();

    let track = |name: &'static str, order: &Arc<Mutex<Vec<String>>>| {
        let order = Arc::clone(order);
        move |args: &tally_core::Args| -> Result<Value, ComputeError> {
            order.lock().push(name.to_owned());
            let mut total = 0;
            for (_, value) in args.iter() {
                total += value.as_i64()?;
            }
            Ok(Value::Int(total))
        }
    };

    // Declared deliberately out of dependency order.
    session.add_node("sink", ["left", "right"], track("sink", &order)).unwrap();
    session.add_node("right", ["top", "x"], track("right", &order)).unwrap();
    session.add_node("left", ["top"], track("left", &order)).unwrap();
    session.add_node("top", ["x"], track("top", &order)).unwrap();

    let outcomes = session.set("x", 2i64).unwrap();
    let ids: Vec<_> = outcomes.iter().map(|(id, _)| id.to_string()).collect();
    assert_eq!(ids, vec!["top", "right", "left", "sink"]);
    assert_eq!(*order.lock(), ids);

    // top = 2, left = 2, right = 2 + 2, sink = 2 + 4
    let sink = outcomes.last().unwrap().1.as_ref().unwrap();
    assert_eq!(**sink, Value::Int(6));
}

/// Nodes A -> C and B -> C -> D, plus E reading only B. A failing leaves B
/// and E intact; C and D report unavailable.
#[test]
fn failure_is_isolated_to_dependents() {
    let mut session = Session::default();
    session.declare("a_in", 1i64).unwrap();
    session.declare("b_in", 1i64).unwrap();

    session
        .add_node("A", ["a_in"], |args| {
            let v = args.get("a_in")?.as_i64()?;
            if v < 0 {
                return Err(ComputeError::failed("negative input"));
            }
            Ok(Value::Int(v))
        })
        .unwrap();
    session
        .add_node("B", ["b_in"], |args| Ok(Value::Int(args.get("b_in")?.as_i64()? * 10)))
        .unwrap();
    session
        .add_node("C", ["A", "B"], |args| {
            Ok(Value::Int(args.get("A")?.as_i64()? + args.get("B")?.as_i64()?))
        })
        .unwrap();
    session
        .add_node("D", ["C"], |args| Ok(Value::Int(args.get("C")?.as_i64()? * 2)))
        .unwrap();
    session
        .add_node("E", ["B"], |args| Ok(Value::Int(args.get("B")?.as_i64()? + 1)))
        .unwrap();

    assert_eq!(*session.evaluate("D").unwrap(), Value::Int(22));

    session.stage("a_in", -1i64).unwrap();
    session.stage("b_in", 2i64).unwrap();
    let outcomes = session.flush().unwrap();

    let ids: Vec<_> = outcomes.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B", "C", "D", "E"]);

    assert!(matches!(
        &outcomes[0].1,
        Err(TallyError::Computation { node, .. }) if node.as_str() == "A"
    ));
    assert_eq!(**outcomes[1].1.as_ref().unwrap(), Value::Int(20));
    assert_eq!(
        outcomes[2].1,
        Err(TallyError::Unavailable {
            node: "C".into(),
            upstream: "A".into()
        })
    );
    assert_eq!(
        outcomes[3].1,
        Err(TallyError::Unavailable {
            node: "D".into(),
            upstream: "A".into()
        })
    );
    assert_eq!(**outcomes[4].1.as_ref().unwrap(), Value::Int(21));

    // A keeps its last good result.
    assert_eq!(*session.graph().cached("A").unwrap(), Value::Int(1));

    // Fixing the input brings everything back.
    let outcomes = session.set("a_in", 3i64).unwrap();
    let d = outcomes.iter().find(|(id, _)| id.as_str() == "D").unwrap();
    assert_eq!(**d.1.as_ref().unwrap(), Value::Int(46));
}

#[test]
fn failed_upload_leaves_dataset_untouched() {
    let mut session = Session::default();
    session.declare("dataset", tally_core::data::Table::new()).unwrap();
    session
        .add_node("rows", ["dataset"], |args| {
            Ok(Value::Int(args.get("dataset")?.as_table()?.row_count() as i64))
        })
        .unwrap();

    session.upload("dataset", b"city,sales\nRecife,10\nNatal,20\n").unwrap();
    let version = session.get("dataset").unwrap().1;

    let err = session
        .upload("dataset", b"city,sales\nRecife,10\nNatal\n")
        .unwrap_err();
    assert!(matches!(err, TallyError::DatasetParse(ref e) if e.line == 3));
    assert_eq!(session.get("dataset").unwrap().1, version);
    assert_eq!(*session.evaluate("rows").unwrap(), Value::Int(2));
}

/// The filter dashboard: a multiselect and a range slider feed a filtered
/// table, which feeds a metric and a chart.
#[test]
fn filter_dashboard_pushes_frames() {
    let sink = Shared::default();
    let mut session = Session::default();
    session.attach(sink.clone());

    session.declare("dataset", tally_core::data::Table::new()).unwrap();
    session.declare("cities", Vec::<Value>::new()).unwrap();
    session.declare("sales_range", vec![0.0, 1000.0]).unwrap();

    session
        .add_node("filtered", ["dataset", "cities", "sales_range"], |args| {
            let table = args.get("dataset")?.as_table()?;
            let range = args.get("sales_range")?.numbers()?;
            let (Some(Some(min)), Some(Some(max))) = (range.first(), range.get(1)) else {
                return Err(ComputeError::failed("range needs two bounds"));
            };
            let predicates = vec![
                Predicate::OneOf {
                    column: "city".into(),
                    values: args.get("cities")?.as_list()?.to_vec(),
                },
                Predicate::Between {
                    column: "sales".into(),
                    min: *min,
                    max: *max,
                },
            ];
            Ok(table.filter(&predicates)?.into())
        })
        .unwrap();
    session
        .add_node("mean_sales", ["filtered"], |args| {
            let table = args.get("filtered")?.as_table()?;
            Ok(Value::Float(stats::mean(&table.numeric("sales")?)?))
        })
        .unwrap();

    session
        .bind(
            "mean_sales",
            View::Metric {
                label: "Average sales".into(),
            },
        )
        .unwrap();
    session
        .bind(
            "filtered",
            View::Chart(ChartSpec::new(ChartKind::Bar, "city").y("sales")),
        )
        .unwrap();

    session
        .upload("dataset", b"city,sales\nRecife,100\nNatal,300\nRecife,500\n")
        .unwrap();

    // Nothing selected yet: zero rows, so the mean is informational.
    {
        let recorded = sink.0.lock();
        let (node, view, outcome) = recorded.frames().last().unwrap();
        assert_eq!(node.as_str(), "mean_sales");
        assert!(matches!(view, Some(View::Metric { .. })));
        assert!(outcome.as_ref().unwrap_err().is_insufficient_data());
        let frame = Frame {
            node,
            view: view.as_ref(),
            outcome,
        };
        assert_eq!(frame.severity(), Severity::Info);
    }

    sink.0.lock().clear();
    session
        .set("cities", vec![Value::from("Recife")])
        .unwrap();
    assert_eq!(sink.0.lock().node_ids(), vec!["filtered", "mean_sales"]);
    let mean = session.evaluate("mean_sales").unwrap();
    assert_eq!(*mean, Value::Float(300.0));

    session.set("sales_range", vec![0.0, 200.0]).unwrap();
    assert_eq!(*session.evaluate("mean_sales").unwrap(), Value::Float(100.0));
}

#[test]
fn reset_restores_defaults_and_recomputes() {
    let (calls, calls_clone) = counter();
    let mut session = mean_session(calls_clone);
    session.set("sales", vec![1.0]).unwrap();

    let outcomes = session.reset().unwrap();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(**outcomes[0].1.as_ref().unwrap(), Value::Float(200.0));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
