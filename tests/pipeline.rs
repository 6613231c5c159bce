use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use cpm_network::export::render_dashboard;
use cpm_network::{
    Error, FacetFilter, Pipeline, PipelineConfig, SearchOutcome, ViewModel, input, run_to_dir,
    search_highlight, visible_nodes,
};

const INTERACTIONS: &str = "\
source,target,weight
Arun_Mozhi,Vandiya,9
Vandiya,Kundavai,6
Arun_Mozhi,Kundavai,7
Kundavai,Poonkuzhali,5
Arun_Mozhi,Poonkuzhali,5
Nandini,Ravidasan,8
Nandini,Soman,6
Ravidasan,Soman,4
Ravidasan,Soman,1
Nandini,Arun_Mozhi,2
";

const CHARACTERS: &str = "\
name,faction
Arun_Mozhi,Chola
Vandiya,Chola
Kundavai,Chola
Nandini,Pandya
Ravidasan,Pandya
Soman,
";

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn set(keys: &[&str]) -> BTreeSet<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

fn embedded_view(html: &str) -> ViewModel {
    let start = html.find("const VIEW = ").unwrap() + "const VIEW = ".len();
    let end = start + html[start..].find(";\n").unwrap();
    serde_json::from_str(&html[start..end]).unwrap()
}

#[test]
fn test_full_run_writes_every_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let interactions = write(dir.path(), "interactions.csv", INTERACTIONS);
    let characters = write(dir.path(), "characters.csv", CHARACTERS);
    let out = dir.path().join("out");

    let config = PipelineConfig {
        k_values: vec![3, 4],
        ..Default::default()
    };
    let characters = Some(characters.as_path());
    let reports = run_to_dir(config, &interactions, characters, &out, true).unwrap();

    assert_eq!(reports.len(), 2);
    let k3 = &reports[0];
    assert_eq!((k3.k, k3.nodes, k3.edges, k3.communities), (3, 7, 8, 2));
    assert_eq!(k3.labels[&0], "Chola (size=4)");
    assert_eq!(k3.labels[&1], "Pandya (size=3)");
    assert_eq!(reports[1].communities, 0);

    for k in [3, 4] {
        for name in [
            format!("cpm_dashboard_k{k}.html"),
            format!("cpm_vis_k{k}.html"),
            format!("cpm_communities_k{k}.csv"),
            format!("node_community_map_k{k}.csv"),
            format!("cpm_graph_k{k}.dot"),
        ] {
            assert!(out.join(&name).is_file(), "missing {name}");
        }
    }

    let communities = fs::read_to_string(out.join("cpm_communities_k3.csv")).unwrap();
    assert_eq!(
        communities,
        "community_id,member\n\
         0,Arun_Mozhi\n0,Kundavai\n0,Poonkuzhali\n0,Vandiya\n\
         1,Nandini\n1,Ravidasan\n1,Soman\n"
    );
    let empty = fs::read_to_string(out.join("cpm_communities_k4.csv")).unwrap();
    assert_eq!(empty, "community_id,member\n");

    let html = fs::read_to_string(out.join("cpm_dashboard_k3.html")).unwrap();
    assert!(html.contains(
        "\"communityLabels\":{\"0\":\"Chola (size=4)\",\"1\":\"Pandya (size=3)\"}"
    ));
    assert!(html.contains("cdn.plot.ly"));

    let draggable = fs::read_to_string(out.join("cpm_vis_k3.html")).unwrap();
    assert!(draggable.contains("vis-network"));
    assert_eq!(embedded_view(&draggable), embedded_view(&html));
}

#[test]
fn test_rerun_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let interactions = write(dir.path(), "interactions.csv", INTERACTIONS);
    let characters = write(dir.path(), "characters.csv", CHARACTERS);

    for out in ["first", "second"] {
        run_to_dir(
            PipelineConfig::default(),
            &interactions,
            Some(characters.as_path()),
            &dir.path().join(out),
            true,
        )
        .unwrap();
    }
    for name in [
        "cpm_dashboard_k3.html",
        "cpm_vis_k3.html",
        "node_community_map_k3.csv",
        "cpm_graph_k3.dot",
    ] {
        let a = fs::read(dir.path().join("first").join(name)).unwrap();
        let b = fs::read(dir.path().join("second").join(name)).unwrap();
        assert_eq!(a, b, "{name} differs between runs");
    }
}

#[test]
fn test_missing_columns_abort_without_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let interactions = write(dir.path(), "interactions.csv", "from,to\nA,B\n");
    let out = dir.path().join("out");

    let err = run_to_dir(PipelineConfig::default(), &interactions, None, &out, true).unwrap_err();
    assert!(matches!(err, Error::MissingColumns { .. }));
    assert!(!out.exists());
}

#[test]
fn test_bad_weight_aborts_without_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let interactions = write(
        dir.path(),
        "interactions.csv",
        "source,target,weight\nA,B,5\nB,C,five\n",
    );
    let out = dir.path().join("out");

    let err = run_to_dir(PipelineConfig::default(), &interactions, None, &out, false).unwrap_err();
    assert!(matches!(err, Error::InvalidWeight { line: 3, .. }));
    assert!(!out.exists());
}

#[test]
fn test_overflowing_weights_abort_without_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let interactions = write(
        dir.path(),
        "interactions.csv",
        "source,target,weight\nA,B,1e308\nB,C,1\nA,B,1e308\nD,E,1\n",
    );
    let out = dir.path().join("out");
    let config = PipelineConfig {
        threshold: 0.0,
        ..Default::default()
    };

    let err = run_to_dir(config, &interactions, None, &out, true).unwrap_err();
    assert!(matches!(err, Error::WeightOverflow { .. }));
    assert!(!out.exists());
}

#[test]
fn test_exported_view_reads_back_exactly() {
    let records = input::read_edges(INTERACTIONS.as_bytes()).unwrap();
    let output = Pipeline::new(PipelineConfig::default())
        .unwrap()
        .run(&records, None)
        .unwrap();
    let view = &output.runs[0].view;
    assert!(view.nodes.iter().all(|n| n.x.is_finite() && n.y.is_finite()));
    assert_eq!(&embedded_view(&render_dashboard(view).unwrap()), view);
}

#[test]
fn test_missing_characters_file_falls_back_to_unknown() {
    let dir = tempfile::tempdir().unwrap();
    let interactions = write(dir.path(), "interactions.csv", INTERACTIONS);
    let missing = dir.path().join("nope.csv");
    let out = dir.path().join("out");

    let config = PipelineConfig::default();
    let reports = run_to_dir(config, &interactions, Some(missing.as_path()), &out, false).unwrap();
    assert_eq!(reports[0].labels[&0], "c0 (size=4)");
    assert!(!out.join("cpm_graph_k3.dot").exists());
}

#[test]
fn test_view_model_drives_client_contract() {
    let records = input::read_edges(INTERACTIONS.as_bytes()).unwrap();
    let attributes = input::read_attributes(CHARACTERS.as_bytes()).unwrap();
    let output = Pipeline::new(PipelineConfig::default())
        .unwrap()
        .run(&records, Some(&attributes))
        .unwrap();
    let view = &output.runs[0].view;

    assert_eq!(view.categories, vec!["Chola", "Pandya", "Unknown"]);
    assert_eq!(view.node("Soman").unwrap().category, "Unknown");
    assert_eq!(view.node("Kundavai").unwrap().communities, vec![0]);

    let filter = FacetFilter::new(["Chola"], [1]);
    assert!(visible_nodes(&view.nodes, &filter).is_empty());

    let filter = FacetFilter::new(["Chola", "Unknown"], []);
    assert_eq!(
        visible_nodes(&view.nodes, &filter),
        set(&["Arun_Mozhi", "Kundavai", "Poonkuzhali", "Soman", "Vandiya"])
    );

    let none: [&str; 0] = [];
    let filter = FacetFilter::new(none, [1]);
    assert_eq!(
        visible_nodes(&view.nodes, &filter),
        set(&["Nandini", "Ravidasan", "Soman"])
    );

    assert_eq!(
        search_highlight(&view.nodes, &view.edges, "poon"),
        SearchOutcome::Highlight(set(&["Arun_Mozhi", "Kundavai", "Poonkuzhali"]))
    );
    assert!(matches!(
        search_highlight(&view.nodes, &view.edges, "Aditha"),
        SearchOutcome::NoMatch { .. }
    ));

    assert!(render_dashboard(view).unwrap().contains("Arun Mozhi"));
}
