use std::path::Path;

use relgraph_core::config::{ExtractionConfig, RelgraphConfig, RenderConfig};
use relgraph_core::model::ClassModel;
use relgraph_parser::classes::extract_classes;
use relgraph_parser::languages::Language;
use relgraph_render::{Format, render};

const SPACE_STATION: &str = r"package com.universe.arch;

import java.util.List;

public class SpaceStation extends OrbitalStructure implements IMaintainable {
    private final LifeSupportSystem lifeSupport = new LifeSupportSystem();
    private List<DockingBay> dockingBays;
    private Pilot activeDutyPilot;

    public void executeMission(MissionControl mc) {
        lifeSupport.checkStatus();
    }

    @Override
    public void performMaintenance(Toolkit tools) {
        tools.calibrate();
    }
}

abstract class OrbitalStructure {
    protected abstract double orbitRadius();
}

interface IMaintainable {
    void performMaintenance(Toolkit t);
}

class Pilot {
}
";

fn station() -> Vec<ClassModel> {
    extract_classes(
        Path::new("SpaceStation.java"),
        SPACE_STATION,
        Language::Java,
        &ExtractionConfig::default(),
    )
    .unwrap()
}

#[test]
fn test_puml_structure() {
    let config = RelgraphConfig {
        render: RenderConfig {
            title: Some("station".to_string()),
            ..RenderConfig::default()
        },
        ..RelgraphConfig::default()
    };
    let out = render(&station(), Format::Puml, &config).unwrap();

    assert!(out.starts_with("@startuml station\n"));
    assert!(out.contains("top to bottom direction"));
    assert!(out.contains("  package \"com.universe.arch\" {\n"));
    assert!(out.contains("    abstract class OrbitalStructure {\n"));
    assert!(out.contains("      #{abstract} orbitRadius() : double\n"));
    assert!(out.contains("    interface IMaintainable {\n      +performMaintenance(Toolkit) : void\n    }\n"));
    assert!(out.contains("      -lifeSupport : LifeSupportSystem\n"));
    assert!(out.contains("      -dockingBays : List<DockingBay>\n"));
    assert!(out.contains("      +executeMission(MissionControl) : void\n"));
    assert!(out.ends_with("@enduml\n"));
}

#[test]
fn test_puml_relationships_sorted() {
    let out = render(&station(), Format::Puml, &RelgraphConfig::default()).unwrap();
    let rels: Vec<&str> = out
        .split("' Relationships\n")
        .nth(1)
        .unwrap()
        .lines()
        .take_while(|l| *l != "@enduml")
        .collect();
    assert_eq!(
        rels,
        vec![
            "IMaintainable ..> Toolkit",
            "IMaintainable <|.. SpaceStation",
            "OrbitalStructure <|-- SpaceStation",
            "SpaceStation *-- LifeSupportSystem",
            "SpaceStation --> Pilot",
            "SpaceStation ..> MissionControl",
            "SpaceStation ..> Toolkit",
            "SpaceStation o-- DockingBay",
        ]
    );
}

#[test]
fn test_aml_relationships() {
    let out = render(&station(), Format::Aml, &RelgraphConfig::default()).unwrap();
    assert!(out.starts_with("namespace com.universe.arch {\n"));
    assert!(out.contains("    abstract class OrbitalStructure {\n"));
    assert!(out.contains("        lifeSupport: LifeSupportSystem [-]\n"));
    assert!(out.contains("SpaceStation --|> OrbitalStructure\n"));
    assert!(out.contains("SpaceStation ..|> IMaintainable\n"));
    assert!(out.contains("SpaceStation *-- LifeSupportSystem [type: composition]\n"));
    assert!(out.contains("SpaceStation o-- DockingBay [type: aggregation]\n"));
    assert!(out.contains("SpaceStation -> Pilot [type: association]\n"));
    assert!(out.contains("SpaceStation ..> Toolkit [type: dependency]\n"));
    assert!(!out.contains("SpaceStation ..> LifeSupportSystem"));
}

#[test]
fn test_json_carries_relations() {
    let out = render(&station(), Format::Json, &RelgraphConfig::default()).unwrap();
    let back: Vec<ClassModel> = serde_json::from_str(&out).unwrap();
    assert_eq!(back, station());
    assert!(out.contains("\"via\": \"activeDutyPilot\""));
}

#[test]
fn test_dot_draws_ingested_entities() {
    let out = render(&station(), Format::Dot, &RelgraphConfig::default()).unwrap();
    assert!(out.starts_with("digraph relgraph {\n"));
    assert!(out.contains("label=\"SpaceStation\\n«IMaintainable»\""));
    assert!(out.contains("label=\"Pilot\"]"));
    // Undeclared types are not entities unless configured.
    assert!(!out.contains("LifeSupportSystem"));
    assert!(out.contains("arrowhead=vee, style=solid, label=\"activeDutyPilot\""));
    // Abstract bases and interfaces are not instantiated.
    assert!(!out.contains("label=\"OrbitalStructure"));
}

#[test]
fn test_dot_with_external_types() {
    let config = RelgraphConfig {
        extraction: ExtractionConfig {
            include_external_types: true,
            ..ExtractionConfig::default()
        },
        ..RelgraphConfig::default()
    };
    let out = render(&station(), Format::Dot, &config).unwrap();
    assert!(out.contains("label=\"LifeSupportSystem\"]"));
    assert!(out.contains("dir=back, arrowtail=diamond"));
    assert!(out.contains("dir=back, arrowtail=odiamond, style=solid, label=\"dockingBays\""));
    assert!(out.contains("style=dashed"));
}
