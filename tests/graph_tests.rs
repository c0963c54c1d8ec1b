use schedule_engine::{Dependency, DependencyType, ScheduleError, Task, TaskGraph};

fn tasks(ids: &[i32]) -> Vec<Task> {
    ids.iter()
        .map(|&id| Task::new(id, format!("T{id}"), 1.0))
        .collect()
}

#[test]
fn diamond_orders_predecessors_first() {
    let tasks = tasks(&[1, 2, 3, 4]);
    let deps = vec![
        Dependency::finish_to_start(2, 1),
        Dependency::finish_to_start(3, 1),
        Dependency::finish_to_start(4, 2),
        Dependency::finish_to_start(4, 3),
    ];
    let graph = TaskGraph::build(&tasks, &deps);

    assert_eq!(graph.topological_order().unwrap(), vec![1, 2, 3, 4]);
    assert_eq!(graph.roots(), vec![1]);
    assert_eq!(graph.leaves(), vec![4]);
    assert_eq!(graph.successors(1), vec![2, 3]);
    assert_eq!(graph.predecessors(4), vec![2, 3]);
    assert_eq!(graph.reachable_from(2), vec![4]);
    assert_eq!(graph.reachable_from(1), vec![2, 3, 4]);
    assert!(!graph.has_cycle());
}

#[test]
fn edges_keep_relation_and_lag() {
    let tasks = tasks(&[1, 2]);
    let deps = vec![Dependency::new(2, 1, DependencyType::StartToStart, 3)];
    let graph = TaskGraph::build(&tasks, &deps);

    let incoming = graph.incoming(2);
    assert_eq!(incoming.len(), 1);
    let (pred, link) = incoming[0];
    assert_eq!(pred, 1);
    assert_eq!(link.dependency_type, DependencyType::StartToStart);
    assert_eq!(link.lag_time, 3);
    assert_eq!(graph.outgoing(1)[0].0, 2);
}

#[test]
fn two_task_cycle_is_reported() {
    let tasks = tasks(&[1, 2]);
    let deps = vec![
        Dependency::finish_to_start(2, 1),
        Dependency::finish_to_start(1, 2),
    ];
    let graph = TaskGraph::build(&tasks, &deps);

    assert!(graph.has_cycle());
    match graph.topological_order() {
        Err(ScheduleError::CycleDetected { task_ids }) => assert_eq!(task_ids, vec![1, 2]),
        other => panic!("expected a cycle, got {other:?}"),
    }
}

#[test]
fn cycle_outside_the_subset_does_not_block_it() {
    let tasks = tasks(&[1, 2, 3, 4]);
    let deps = vec![
        Dependency::finish_to_start(2, 1),
        Dependency::finish_to_start(4, 3),
        Dependency::finish_to_start(3, 4),
    ];
    let graph = TaskGraph::build(&tasks, &deps);

    assert_eq!(graph.topological_order_within(&[1, 2]).unwrap(), vec![1, 2]);
    assert!(graph.topological_order().is_err());
}

#[test]
fn links_to_unknown_tasks_are_skipped() {
    let tasks = tasks(&[1, 2]);
    let deps = vec![
        Dependency::finish_to_start(2, 1),
        Dependency::finish_to_start(2, 99),
    ];
    let graph = TaskGraph::build(&tasks, &deps);

    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.edge_count(), 1);
    assert!(!graph.contains(99));
}

#[test]
fn filtered_build_drops_excluded_tasks_and_their_edges() {
    let mut tasks = tasks(&[1, 2, 3]);
    tasks[1].name = "skip".into();
    let deps = vec![
        Dependency::finish_to_start(2, 1),
        Dependency::finish_to_start(3, 2),
    ];
    let graph = TaskGraph::build_filtered(&tasks, &deps, |task| task.name != "skip");

    assert_eq!(graph.task_ids(), vec![1, 3]);
    assert_eq!(graph.edge_count(), 0);
    assert_eq!(graph.roots(), vec![1, 3]);
}
