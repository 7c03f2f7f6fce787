//! Integration tests for ir-eval-providers.

use std::collections::BTreeMap;
use std::io::Cursor;

use ir_eval::{
    Frame, Measure, Metric, QrelsConverter, QrelsMap, RunConverter, ScoredDoc, measures,
    parse_trec_qrels,
};
use ir_eval_providers::{
    DefineOptions, Evaluator, FallbackProvider, JudgedProvider, NativeProvider, Pipeline, Provider,
    ProviderError, RuntimeProvider, TrecEvalConfig, TrecEvalProvider,
};

fn scenario_qrels() -> QrelsMap {
    let mut q0 = BTreeMap::new();
    for (doc, rel) in [("D0", 0), ("D1", 1), ("D2", 1), ("D3", 2), ("D4", 0)] {
        q0.insert(doc.to_string(), rel);
    }
    let mut qrels = QrelsMap::new();
    qrels.insert("Q0".to_string(), q0);
    qrels
}

fn scenario_run() -> Vec<ScoredDoc> {
    vec![
        ScoredDoc::new("Q0", "D0", 0.8),
        ScoredDoc::new("Q0", "D2", 0.7),
        ScoredDoc::new("Q0", "D1", 0.3),
        ScoredDoc::new("Q0", "D3", 0.4),
        ScoredDoc::new("Q0", "D4", 0.1),
    ]
}

fn in_process() -> Pipeline {
    Pipeline::new(vec![
        Box::new(NativeProvider::new()),
        Box::new(JudgedProvider::new()),
        Box::new(RuntimeProvider::new()),
    ])
}

fn missing_trec_eval() -> TrecEvalProvider {
    TrecEvalProvider::new(TrecEvalConfig::new().with_binary("/nonexistent/trec_eval"))
}

#[test]
fn precision_at_five() {
    // Arrange
    let p5 = measures::precision().rel(1).at(5);

    // Act
    let rows = in_process()
        .iter_calc([&p5], scenario_qrels(), scenario_run())
        .unwrap();

    // Assert
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].query_id, "Q0");
    assert!((rows[0].value - 0.6).abs() < 1e-9);
}

#[test]
fn judged_query_missing_from_run_gets_default() {
    let mut qrels = scenario_qrels();
    qrels.insert("Q1".to_string(), BTreeMap::from([("D9".to_string(), 1)]));
    let judged = measures::judged().at(5);

    let rows = in_process()
        .iter_calc([&judged], qrels, scenario_run())
        .unwrap();

    assert!(rows.contains(&Metric::new("Q1", judged.clone(), 0.0)));
    assert_eq!(rows.len(), 2);
}

#[test]
fn unsupported_measure_is_named() {
    let result = in_process().iter_calc([measures::err().at(20)], scenario_qrels(), scenario_run());

    match result {
        Err(ProviderError::Unsupported { measures, candidates }) => {
            assert_eq!(measures, vec!["ERR@20".to_string()]);
            assert!(candidates.is_empty());
        }
        other => panic!("expected unsupported, got {other:?}"),
    }
}

#[test]
fn unavailable_provider_is_suggested() {
    let pipeline = Pipeline::new(vec![
        Box::new(NativeProvider::new()),
        Box::new(missing_trec_eval()),
    ]);

    let err = pipeline.plan([measures::bpref()]).unwrap_err();

    let message = err.to_string();
    assert!(message.starts_with("unsupported measures [Bpref]."));
    assert!(message.contains(" - trec_eval ("));
    assert!(message.contains("github.com/usnistgov/trec_eval"));
}

#[test]
fn disjoint_providers_split_a_request() {
    // Arrange
    let requested = vec![
        measures::precision().at(5),
        measures::average_precision(),
        measures::judged().at(5),
        measures::judged().at(10),
    ];
    let fallback = FallbackProvider::new(vec![
        Box::new(NativeProvider::new()),
        Box::new(JudgedProvider::new()),
    ]);

    // Act
    let plan = fallback.plan(&requested).unwrap();
    let evaluator = fallback
        .evaluator(requested.clone(), scenario_qrels().into())
        .unwrap();
    let aggregated = evaluator.calc_aggregate(scenario_run().into()).unwrap();

    // Assert
    assert_eq!(plan.len(), 2);
    assert_eq!(plan.assignments()[0].measures.len(), 2);
    assert_eq!(plan.assignments()[1].measures.len(), 2);
    assert_eq!(aggregated.len(), 4);
    assert!((aggregated[&requested[0]] - 0.6).abs() < 1e-9);
    let ap = (1.0 / 2.0 + 2.0 / 3.0 + 3.0 / 4.0) / 3.0;
    assert!((aggregated[&requested[1]] - ap).abs() < 1e-9);
    assert!((aggregated[&requested[2]] - 1.0).abs() < 1e-9);
    assert!((aggregated[&requested[3]] - 0.5).abs() < 1e-9);
}

#[test]
fn qrels_shapes_agree() {
    let requested = [
        measures::precision().at(3),
        measures::ndcg(),
        measures::judged().at(4),
    ];
    let text = "Q0 0 D0 0\nQ0 0 D1 1\nQ0 0 D2 1\nQ0 0 D3 2\nQ0 0 D4 0\n";
    let streamed = QrelsConverter::from_results(parse_trec_qrels(Cursor::new(text.to_string())));

    let from_mapping = in_process()
        .iter_calc(requested.clone(), scenario_qrels(), scenario_run())
        .unwrap();
    let from_stream = in_process()
        .iter_calc(requested, streamed, scenario_run())
        .unwrap();

    assert_eq!(from_mapping, from_stream);
}

#[test]
fn bound_evaluator_scores_several_runs() {
    let rr = measures::reciprocal_rank();
    let evaluator = in_process().bind([&rr], scenario_qrels()).unwrap();

    let first = evaluator.calc_aggregate(scenario_run().into()).unwrap();
    let flipped: Vec<ScoredDoc> = scenario_run()
        .into_iter()
        .map(|d| ScoredDoc::new(d.query_id, d.doc_id, -d.score))
        .collect();
    let second = evaluator.calc_aggregate(flipped.into()).unwrap();

    assert!((first[&rr] - 0.5).abs() < 1e-9);
    assert!((second[&rr] - 0.5).abs() < 1e-9);
}

#[test]
fn runtime_measure_through_pipeline() {
    let top_score = RuntimeProvider::define_by_query(
        "TopScore",
        |_qrels: &Frame, run: &Frame| {
            run.get(0, "score")
                .and_then(ir_eval::Value::as_float)
                .unwrap_or(0.0)
        },
        DefineOptions::default(),
    );
    let pipeline = in_process();

    let calc = pipeline
        .calc([top_score.clone(), measures::precision().at(5)], scenario_qrels(), scenario_run())
        .unwrap();

    assert_eq!(pipeline.plan([&top_score]).unwrap().provider_for(&top_score), Some("runtime"));
    assert!((calc.aggregated[&top_score] - 0.8).abs() < 1e-9);
    assert_eq!(calc.per_query.len(), 2);
}

#[test]
fn direct_call_to_unavailable_provider_fails() {
    let provider = missing_trec_eval();

    let err = provider
        .evaluator(vec![measures::bpref()], scenario_qrels().into())
        .err().unwrap();

    assert!(err.is_unavailable());
    assert!(err.to_string().contains("IR_EVAL_TREC_EVAL"));
}

#[test]
fn invalid_measure_is_rejected_not_downgraded() {
    let bad: Measure = measures::ndcg().dcg("log10");

    let err = in_process().supports(&bad).unwrap_err();

    assert!(err.is_validation());
}

#[test]
fn empty_run_backfills_every_judged_query() {
    // defaults come out ordered by measure: NumQ before P@5
    let requested = [measures::precision().at(5), measures::num_q()];

    let rows = in_process()
        .iter_calc(requested.clone(), scenario_qrels(), RunConverter::from(Vec::new()))
        .unwrap();

    assert_eq!(
        rows,
        vec![
            Metric::new("Q0", requested[1].clone(), 0.0),
            Metric::new("Q0", requested[0].clone(), 0.0),
        ]
    );
}

#[test]
fn qrels_table_must_have_columns() {
    let table = Frame::new(["query_id", "doc_id"]).with_row([Some("Q0".into()), Some("D0".into())]);

    let err = in_process()
        .bind([measures::precision().at(5)], QrelsConverter::from(table))
        .err().unwrap();

    assert!(matches!(err, ProviderError::Format(_)));
}

#[cfg(unix)]
fn scripted_trec_eval(dir: &std::path::Path) -> TrecEvalProvider {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join("trec_eval");
    std::fs::write(&script, "#!/bin/sh\nprintf 'P_5\\tQ0\\t0.2500\\n'\n").unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    TrecEvalProvider::new(TrecEvalConfig::new().with_binary(script))
}

#[cfg(unix)]
#[test]
fn earlier_capable_provider_computes_shared_measure() {
    // Arrange: both providers compute P@5 but disagree on its value
    let dir = tempfile::tempdir().unwrap();
    let p5 = measures::precision().at(5);
    let trec_first = Pipeline::new(vec![
        Box::new(scripted_trec_eval(dir.path())),
        Box::new(NativeProvider::new()),
    ]);
    let native_first = Pipeline::new(vec![
        Box::new(NativeProvider::new()),
        Box::new(scripted_trec_eval(dir.path())),
    ]);

    // Act
    let trec_plan = trec_first.plan([&p5]).unwrap();
    let native_plan = native_first.plan([&p5]).unwrap();
    let trec_rows = trec_first.iter_calc([&p5], scenario_qrels(), scenario_run()).unwrap();
    let native_rows = native_first.iter_calc([&p5], scenario_qrels(), scenario_run()).unwrap();

    // Assert
    assert_eq!(trec_plan.provider_for(&p5), Some("trec_eval"));
    assert_eq!(native_plan.provider_for(&p5), Some("native"));
    assert_eq!(trec_rows, vec![Metric::new("Q0", p5.clone(), 0.25)]);
    assert_eq!(native_rows.len(), 1);
    assert!((native_rows[0].value - 0.6).abs() < 1e-9);
}
