use std::sync::{Arc, Mutex};

use bindery::cond::{BeanSelector, BeanSet, Condition, ConditionContext, Conditional};
use bindery::configer::{Configer, ConfigerError, ConfigerGraph};
use bindery::{Binder, Describe, Properties};
use serde::Deserialize;

#[derive(Debug, Clone, Describe, Deserialize)]
struct Server {
    #[value("${port:=8080}")]
    port: u16,
    #[value("${hosts:=localhost}")]
    hosts: Vec<String>,
}

struct Cache;

type Log = Arc<Mutex<Vec<String>>>;

fn recorder(log: &Log, name: &'static str) -> Configer {
    let log = Arc::clone(log);
    Configer::new(name, Vec::<String>::new(), move || {
        log.lock().unwrap().push(name.to_owned());
        Ok::<_, String>(())
    })
    .unwrap()
}

#[test]
fn configers_run_in_dependency_order_with_bound_arguments() {
    let log: Log = Arc::default();
    let seen = Arc::new(Mutex::new(None));
    let out = Arc::clone(&seen);

    let mut graph = ConfigerGraph::new();
    graph
        .register(
            Configer::new("server", ["${server}", "${app.name:=demo}"], move |server: Server, name: String| {
                *out.lock().unwrap() = Some((server, name));
                Ok::<_, String>(())
            })
            .unwrap()
            .after(["database"]),
        )
        .unwrap();
    graph
        .register(recorder(&log, "metrics").after(["server"]).condition_on_profile("prod"))
        .unwrap();
    graph
        .register(recorder(&log, "database").before(["server", "metrics"]))
        .unwrap();
    graph
        .register(
            recorder(&log, "cache")
                .condition_on_missing_bean(BeanSelector::of::<Cache>())
                .or()
                .condition_on_property_value("cache.enabled", "true"),
        )
        .unwrap();

    assert_eq!(
        graph.sorted_names().unwrap(),
        ["database", "server", "metrics", "cache"]
    );

    let props = Properties::from_pairs([
        ("server.port", "9000"),
        ("server.hosts", "a.example, b.example"),
        ("app.profiles.active", "dev"),
        ("cache.enabled", "true"),
    ])
    .unwrap();
    let beans = BeanSet::new().with::<Cache>("cache");
    let ctx = ConditionContext::new(&props).with_beans(&beans);

    let report = graph.run(&Binder::default(), &ctx).unwrap();
    assert_eq!(report.executed(), ["database", "server", "cache"]);
    assert_eq!(report.skipped(), ["metrics"]);
    assert_eq!(*log.lock().unwrap(), ["database", "cache"]);

    let (server, name) = seen.lock().unwrap().take().unwrap();
    assert_eq!(server.port, 9000);
    assert_eq!(server.hosts, ["a.example", "b.example"]);
    assert_eq!(name, "demo");
}

#[test]
fn cycle_is_reported_with_the_full_chain() {
    let log: Log = Arc::default();
    let mut graph = ConfigerGraph::new();
    for (name, next) in [("A", "B"), ("B", "C"), ("C", "A")] {
        graph.register(recorder(&log, name).before([next])).unwrap();
    }

    let props = Properties::new();
    let err = graph
        .run(&Binder::default(), &ConditionContext::new(&props))
        .expect_err("cycle");
    let ConfigerError::Cycle { chain } = &err else {
        panic!("expected a cycle, got {err:?}");
    };
    for name in ["A", "B", "C"] {
        assert!(chain.iter().any(|n| n == name));
    }
    assert!(err.to_string().starts_with("found cycle config: "));
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn negated_and_nested_conditions_compose() {
    let log: Log = Arc::default();
    let nested = Conditional::new()
        .on_property("feature.a")
        .or()
        .on_property("feature.b");
    let mut graph = ConfigerGraph::new();
    graph
        .register(
            recorder(&log, "features")
                .condition_on(nested)
                .condition_not(Condition::OnProperty("feature.off".into()))
                .condition_on_expression("${feature.level:=1} >= 2"),
        )
        .unwrap();

    let props = Properties::from_pairs([("feature.b", "yes"), ("feature.level", "3")]).unwrap();
    let report = graph
        .run(&Binder::default(), &ConditionContext::new(&props))
        .unwrap();
    assert_eq!(report.executed(), ["features"]);
}

#[test]
fn argument_errors_stop_the_run() {
    let mut graph = ConfigerGraph::new();
    graph
        .register(Configer::new("server", ["${server}"], |_: Server| Ok::<_, String>(())).unwrap())
        .unwrap();

    let props = Properties::from_pairs([("server.port", "http")]).unwrap();
    let err = graph
        .run(&Binder::default(), &ConditionContext::new(&props))
        .expect_err("port is not a number");
    assert!(matches!(err, ConfigerError::Bind { ref name, .. } if name == "server"));
}
