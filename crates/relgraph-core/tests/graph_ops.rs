use relgraph_core::error::{GraphError, Handle};
use relgraph_core::graph::*;
use relgraph_core::registry::{OperationSig, RegistryBuilder, TypeDecl, TypeRegistry};
use std::collections::BTreeSet;
use std::sync::Arc;

fn fleet_registry() -> Arc<TypeRegistry> {
    let mut builder = RegistryBuilder::new();
    builder
        .declare_role("IMaintainable", [OperationSig::new("performMaintenance", 1)])
        .unwrap();
    builder
        .declare_role("Identifiable", [OperationSig::new("getId", 0)])
        .unwrap();
    builder
        .declare_type(TypeDecl::abstract_base("OrbitalStructure"))
        .unwrap();
    builder
        .declare_type(
            TypeDecl::concrete("SpaceStation")
                .extends("OrbitalStructure")
                .binds(OperationSig::new("performMaintenance", 1))
                .binds(OperationSig::new("executeMission", 1)),
        )
        .unwrap();
    for tag in [
        "LifeSupportSystem",
        "StructuralIntegrity",
        "DockingBay",
        "Starship",
        "Employee",
        "Part",
    ] {
        builder.declare_type(TypeDecl::concrete(tag)).unwrap();
    }
    Arc::new(builder.build().unwrap())
}

fn new_graph() -> RelationGraph {
    RelationGraph::new(fleet_registry())
}

fn part(graph: &mut RelationGraph) -> EntityId {
    graph.create_entity("Part", Vec::<String>::new()).unwrap()
}

fn reach(graph: &RelationGraph, id: EntityId, kinds: EdgeKinds) -> Vec<EntityId> {
    graph.reachable(id, kinds).unwrap().collect()
}

#[test]
fn test_create_entity_assigns_fresh_ids() {
    let mut graph = new_graph();
    let a = part(&mut graph);
    let b = part(&mut graph);
    assert_ne!(a, b);
    graph.delete_entity(b).unwrap();
    let c = part(&mut graph);
    assert_ne!(c, b, "ids must not be reused while the graph is live");
    assert_eq!(graph.entity_count(), 2);
}

#[test]
fn test_create_entity_with_satisfied_role() {
    let mut graph = new_graph();
    let station = graph
        .create_entity("SpaceStation", ["IMaintainable"])
        .unwrap();
    assert!(graph.satisfies(station, "IMaintainable").unwrap());
    assert!(!graph.satisfies(station, "Identifiable").unwrap());
}

#[test]
fn test_role_contract_violation() {
    let mut graph = new_graph();
    let err = graph
        .create_entity("Employee", ["Identifiable"])
        .unwrap_err();
    assert_eq!(
        err,
        GraphError::RoleContractViolation {
            type_tag: "Employee".to_string(),
            role: "Identifiable".to_string(),
            missing: vec!["getId/0".to_string()],
        }
    );
    assert_eq!(graph.entity_count(), 0);
}

#[test]
fn test_unknown_type_and_role_rejected() {
    let mut graph = new_graph();
    assert_eq!(
        graph.create_entity("Captain", Vec::<String>::new()),
        Err(GraphError::UnknownType("Captain".to_string()))
    );
    assert_eq!(
        graph.create_entity("Starship", ["Dockable"]),
        Err(GraphError::UnknownRole("Dockable".to_string()))
    );
}

#[test]
fn test_abstract_type_not_instantiable() {
    let mut graph = new_graph();
    assert_eq!(
        graph.create_entity("OrbitalStructure", Vec::<String>::new()),
        Err(GraphError::AbstractType("OrbitalStructure".to_string()))
    );
}

#[test]
fn test_add_edge_unknown_endpoint() {
    let mut graph = new_graph();
    let a = part(&mut graph);
    let b = part(&mut graph);
    graph.delete_entity(b).unwrap();
    assert_eq!(
        graph.add_edge(EdgeSpec::aggregation(a, b)),
        Err(GraphError::UnknownEntity(Handle::Entity(b)))
    );
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn test_composition_cycle_detected() {
    let mut graph = new_graph();
    let a = part(&mut graph);
    let b = part(&mut graph);
    graph.add_edge(EdgeSpec::composition(a, b)).unwrap();
    assert_eq!(
        graph.add_edge(EdgeSpec::composition(b, a)),
        Err(GraphError::CycleDetected { parent: b, child: a })
    );
    assert_eq!(graph.edge_count(), 1);
}

#[test]
fn test_composition_long_cycle_and_self_edge_detected() {
    let mut graph = new_graph();
    let a = part(&mut graph);
    let b = part(&mut graph);
    let c = part(&mut graph);
    graph.add_edge(EdgeSpec::composition(a, b)).unwrap();
    graph.add_edge(EdgeSpec::composition(b, c)).unwrap();
    assert!(matches!(
        graph.add_edge(EdgeSpec::composition(c, a)),
        Err(GraphError::CycleDetected { .. })
    ));
    assert!(matches!(
        graph.add_edge(EdgeSpec::composition(a, a)),
        Err(GraphError::CycleDetected { .. })
    ));
}

#[test]
fn test_ownership_conflict() {
    let mut graph = new_graph();
    let a = part(&mut graph);
    let b = part(&mut graph);
    let c = part(&mut graph);
    graph.add_edge(EdgeSpec::composition(a, b)).unwrap();
    assert_eq!(
        graph.add_edge(EdgeSpec::composition(c, b)),
        Err(GraphError::OwnershipConflict {
            target: b,
            owner: a
        })
    );
    assert_eq!(graph.composer_of(b), Some(a));
}

#[test]
fn test_non_owning_edges_may_cycle() {
    let mut graph = new_graph();
    let station = graph.create_entity("SpaceStation", ["IMaintainable"]).unwrap();
    let ship = graph.create_entity("Starship", Vec::<String>::new()).unwrap();
    graph.add_edge(EdgeSpec::association(station, ship)).unwrap();
    graph.add_edge(EdgeSpec::association(ship, station)).unwrap();
    graph.add_edge(EdgeSpec::aggregation(ship, station)).unwrap();
    assert_eq!(graph.edge_count(), 3);
    assert!(graph.check_invariants().is_empty());
}

#[test]
fn test_cardinality_one_violation() {
    let mut graph = new_graph();
    let station = graph.create_entity("SpaceStation", ["IMaintainable"]).unwrap();
    let first = graph.create_entity("Employee", Vec::<String>::new()).unwrap();
    let second = graph.create_entity("Employee", Vec::<String>::new()).unwrap();

    graph
        .add_edge(
            EdgeSpec::association(station, first)
                .labeled("activeDutyPilot")
                .cardinality(Cardinality::One),
        )
        .unwrap();
    assert_eq!(
        graph.add_edge(EdgeSpec::association(station, second).labeled("activeDutyPilot")),
        Err(GraphError::CardinalityViolation {
            holder: station,
            label: Some("activeDutyPilot".to_string()),
        })
    );

    // A different label is a different role.
    graph
        .add_edge(
            EdgeSpec::association(station, second)
                .labeled("stationMaster")
                .cardinality(Cardinality::One),
        )
        .unwrap();
}

#[test]
fn test_cardinality_many_allows_multiple() {
    let mut graph = new_graph();
    let station = graph.create_entity("SpaceStation", ["IMaintainable"]).unwrap();
    for _ in 0..3 {
        let ship = graph.create_entity("Starship", Vec::<String>::new()).unwrap();
        graph
            .add_edge(
                EdgeSpec::association(station, ship)
                    .labeled("dockedStarships")
                    .cardinality(Cardinality::Many),
            )
            .unwrap();
    }
    assert_eq!(graph.edges_from(station).count(), 3);
}

#[test]
fn test_remove_edge_does_not_cascade() {
    let mut graph = new_graph();
    let a = part(&mut graph);
    let b = part(&mut graph);
    let edge = graph.add_edge(EdgeSpec::composition(a, b)).unwrap();
    let removed = graph.remove_edge(edge).unwrap();
    assert_eq!(removed.kind, EdgeKind::Composition);
    assert!(graph.contains(a));
    assert!(graph.contains(b));
    assert_eq!(graph.composer_of(b), None);

    // b is free to be composed again.
    let c = part(&mut graph);
    graph.add_edge(EdgeSpec::composition(c, b)).unwrap();
}

#[test]
fn test_remove_edge_twice() {
    let mut graph = new_graph();
    let a = part(&mut graph);
    let b = part(&mut graph);
    let keep = graph.add_edge(EdgeSpec::aggregation(b, a)).unwrap();
    let edge = graph.add_edge(EdgeSpec::dependency(a, b)).unwrap();

    graph.remove_edge(edge).unwrap();
    let after_first: Vec<Edge> = graph.edges().cloned().collect();

    assert_eq!(
        graph.remove_edge(edge),
        Err(GraphError::UnknownEntity(Handle::Edge(edge)))
    );
    let after_second: Vec<Edge> = graph.edges().cloned().collect();
    assert_eq!(after_first, after_second);
    assert!(graph.edge(keep).is_some());
}

#[test]
fn test_add_then_remove_restores_edge_set() {
    let mut graph = new_graph();
    let a = part(&mut graph);
    let b = part(&mut graph);
    let c = part(&mut graph);
    graph.add_edge(EdgeSpec::composition(a, b)).unwrap();
    graph.add_edge(EdgeSpec::association(c, a).labeled("owner")).unwrap();
    let before: Vec<Edge> = graph.edges().cloned().collect();

    for kind in EdgeKind::ALL {
        let edge = graph.add_edge(EdgeSpec::new(c, b, kind));
        // Composition is refused here (b already composed); others round-trip.
        if let Ok(edge) = edge {
            graph.remove_edge(edge).unwrap();
        }
        let after: Vec<Edge> = graph.edges().cloned().collect();
        assert_eq!(before, after, "edge set changed after {kind} round trip");
    }
}

#[test]
fn test_station_scenario() {
    let mut graph = new_graph();
    let station = graph.create_entity("SpaceStation", ["IMaintainable"]).unwrap();
    let life = graph
        .create_entity("LifeSupportSystem", Vec::<String>::new())
        .unwrap();
    let hull = graph
        .create_entity("StructuralIntegrity", Vec::<String>::new())
        .unwrap();
    let bay = graph.create_entity("DockingBay", Vec::<String>::new()).unwrap();
    let ship = graph.create_entity("Starship", Vec::<String>::new()).unwrap();

    graph.add_edge(EdgeSpec::composition(station, life)).unwrap();
    graph.add_edge(EdgeSpec::composition(station, hull)).unwrap();
    graph
        .add_edge(EdgeSpec::aggregation(station, bay).labeled("dockingBays"))
        .unwrap();
    graph
        .add_edge(
            EdgeSpec::association(station, ship)
                .labeled("dockedStarships")
                .cardinality(Cardinality::Many),
        )
        .unwrap();

    let doomed: BTreeSet<EntityId> = reach(&graph, station, EdgeKinds::OWNERSHIP)
        .into_iter()
        .collect();
    assert_eq!(doomed, BTreeSet::from([life, hull]));

    let deleted = graph.delete_entity(station).unwrap();
    assert_eq!(deleted.len(), 3);
    assert_eq!(deleted.last(), Some(&station));

    for gone in [station, life, hull] {
        assert!(!graph.contains(gone));
    }
    assert!(graph.contains(bay));
    assert!(graph.contains(ship));
    assert_eq!(graph.edge_count(), 0);
    assert_eq!(graph.edges_to(bay).count(), 0);
    assert_eq!(graph.edges_to(ship).count(), 0);
    assert!(graph.check_invariants().is_empty());
}

#[test]
fn test_delete_cascades_post_order() {
    let mut graph = new_graph();
    let root = part(&mut graph);
    let mid = part(&mut graph);
    let leaf = part(&mut graph);
    let sibling = part(&mut graph);
    graph.add_edge(EdgeSpec::composition(root, mid)).unwrap();
    graph.add_edge(EdgeSpec::composition(mid, leaf)).unwrap();
    graph.add_edge(EdgeSpec::composition(root, sibling)).unwrap();

    let deleted = graph.delete_entity(root).unwrap();
    assert_eq!(deleted, vec![leaf, mid, sibling, root]);
    assert_eq!(graph.entity_count(), 0);
}

#[test]
fn test_delete_does_not_follow_aggregation() {
    let mut graph = new_graph();
    let owner = part(&mut graph);
    let composed = part(&mut graph);
    let grouped = part(&mut graph);
    let grouped_child = part(&mut graph);
    graph.add_edge(EdgeSpec::composition(owner, composed)).unwrap();
    graph.add_edge(EdgeSpec::aggregation(composed, grouped)).unwrap();
    graph
        .add_edge(EdgeSpec::composition(grouped, grouped_child))
        .unwrap();

    graph.delete_entity(owner).unwrap();
    assert!(graph.contains(grouped));
    assert!(graph.contains(grouped_child));
    assert_eq!(graph.composer_of(grouped_child), Some(grouped));
}

#[test]
fn test_delete_composed_child_frees_parent_edge() {
    let mut graph = new_graph();
    let a = part(&mut graph);
    let b = part(&mut graph);
    graph.add_edge(EdgeSpec::composition(a, b)).unwrap();
    graph.delete_entity(b).unwrap();
    assert!(graph.contains(a));
    assert_eq!(graph.edges_from(a).count(), 0);
}

#[test]
fn test_delete_unknown_entity() {
    let mut graph = new_graph();
    let a = part(&mut graph);
    let b = part(&mut graph);
    graph.add_edge(EdgeSpec::association(a, b)).unwrap();
    graph.delete_entity(b).unwrap();

    let before: Vec<Edge> = graph.edges().cloned().collect();
    assert_eq!(
        graph.delete_entity(b),
        Err(GraphError::UnknownEntity(Handle::Entity(b)))
    );
    assert_eq!(graph.edges().cloned().collect::<Vec<_>>(), before);
    assert_eq!(graph.entity_count(), 1);
}

#[test]
fn test_deleted_id_is_terminal() {
    let mut graph = new_graph();
    let a = part(&mut graph);
    graph.delete_entity(a).unwrap();
    assert!(graph.satisfies(a, "Identifiable").is_err());
    assert!(graph.reachable(a, EdgeKinds::ALL).is_err());
}

#[test]
fn test_reachable_filters_by_kind() {
    let mut graph = new_graph();
    let fleet = part(&mut graph);
    let station = part(&mut graph);
    let ship = part(&mut graph);
    let toolkit = part(&mut graph);
    let core = part(&mut graph);
    graph.add_edge(EdgeSpec::association(fleet, station)).unwrap();
    graph.add_edge(EdgeSpec::aggregation(fleet, ship)).unwrap();
    graph.add_edge(EdgeSpec::dependency(station, toolkit)).unwrap();
    graph.add_edge(EdgeSpec::composition(ship, core)).unwrap();

    assert_eq!(reach(&graph, fleet, EdgeKinds::USAGE), vec![station, toolkit]);
    assert_eq!(
        reach(&graph, fleet, EdgeKinds::ALL),
        vec![station, ship, toolkit, core]
    );
    assert!(reach(&graph, fleet, EdgeKinds::NONE).is_empty());
    assert_eq!(
        reach(&graph, fleet, [EdgeKind::Aggregation].into_iter().collect()),
        vec![ship]
    );
}

#[test]
fn test_reachable_terminates_on_cycles_and_is_restartable() {
    let mut graph = new_graph();
    let a = part(&mut graph);
    let b = part(&mut graph);
    let c = part(&mut graph);
    graph.add_edge(EdgeSpec::association(a, b)).unwrap();
    graph.add_edge(EdgeSpec::association(b, c)).unwrap();
    graph.add_edge(EdgeSpec::association(c, a)).unwrap();
    graph.add_edge(EdgeSpec::association(b, a)).unwrap();

    let walk = graph.reachable(a, EdgeKinds::USAGE).unwrap();
    let forked = walk.clone();
    assert_eq!(walk.collect::<Vec<_>>(), vec![b, c]);
    assert_eq!(forked.collect::<Vec<_>>(), vec![b, c]);
    assert_eq!(reach(&graph, a, EdgeKinds::USAGE), vec![b, c]);
}

#[test]
fn test_edge_kind_parse() {
    assert_eq!("composition".parse::<EdgeKind>(), Ok(EdgeKind::Composition));
    assert_eq!("DEPENDENCY".parse::<EdgeKind>(), Ok(EdgeKind::Dependency));
    assert!("inherits".parse::<EdgeKind>().is_err());
}
