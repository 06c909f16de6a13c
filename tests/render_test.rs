//! Integration tests for plot report rendering

use std::path::PathBuf;

#[path = "../src/report.rs"]
mod report;

use report::{ArtifactFormat, PlotList, PlotRecord, ReportError, ReportRenderer, Template};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn scenario_plots() -> PlotList {
    PlotList::new(vec![
        PlotRecord::new("PNGDATA1", "First plot", "scatter"),
        PlotRecord::new("PNGDATA2", "Second plot", "line"),
    ])
}

#[test]
fn test_scenario_report() {
    let template = Template::from_text(
        "<p>{{plots[0][0]}}</p><p>{{plots[0][1]}}</p><p>{{plots[1][0]}}</p><p>{{plots[1][1]}}</p>",
    );
    let report = template.render(&scenario_plots());

    insta::assert_snapshot!(report, @"<p>PNGDATA1</p><p>First plot</p><p>PNGDATA2</p><p>Second plot</p>");
}

#[test]
fn test_all_placeholders_replaced() {
    let plots = scenario_plots();
    let template = Template::load(&fixture_path("report_template.html"))
        .expect("Failed to load template");
    let rendered = template.render_with_summary(&plots);

    assert_eq!(rendered.substituted, 4);
    assert!(rendered.unresolved.is_empty());
    assert!(!rendered.text.contains("{{plots["));
    for record in &plots {
        assert!(rendered.text.contains(&record.content));
        assert!(rendered.text.contains(&record.description));
    }
}

#[test]
fn test_out_of_range_placeholder_left_unchanged() {
    let template = Template::from_text("{{plots[0][1]}} / {{plots[2][0]}} / {{plots[7][1]}}");
    let report = template.render(&scenario_plots());

    assert_eq!(report, "First plot / {{plots[2][0]}} / {{plots[7][1]}}");
}

#[test]
fn test_repeated_placeholder_replaced_everywhere() {
    let template = Template::from_text("<h2>{{plots[1][1]}}</h2><figcaption>{{plots[1][1]}}</figcaption>");
    let report = template.render(&scenario_plots());

    assert_eq!(report, "<h2>Second plot</h2><figcaption>Second plot</figcaption>");
}

#[test]
fn test_substituted_text_is_not_expanded_again() {
    let plots = PlotList::new(vec![
        PlotRecord::new("see {{plots[1][0]}}", "{{plots[0][1]}}", "bar"),
        PlotRecord::new("PNGDATA2", "Second plot", "line"),
    ]);
    let template = Template::from_text("{{plots[0][0]}}|{{plots[0][1]}}|{{plots[1][0]}}");

    assert_eq!(
        template.render(&plots),
        "see {{plots[1][0]}}|{{plots[0][1]}}|PNGDATA2"
    );
}

#[test]
fn test_empty_plot_list_keeps_template() {
    let text = "<p>{{plots[0][0]}}</p><p>no plots here</p>";
    let template = Template::from_text(text);

    assert_eq!(template.render(&PlotList::default()), text);
}

#[test]
fn test_plot_type_is_never_substituted() {
    let template = Template::from_text("{{plots[0][2]}}");

    assert_eq!(template.render(&scenario_plots()), "{{plots[0][2]}}");
}

#[test]
fn test_pickle_and_json_artifacts_agree() {
    let from_pickle = PlotList::load(&fixture_path("plots_with_base64.pkl"), None)
        .expect("Failed to load pickle artifact");
    let from_json = PlotList::load(&fixture_path("plots.json"), None)
        .expect("Failed to load json artifact");

    assert_eq!(from_pickle, from_json);
    assert_eq!(from_pickle.len(), 2);
    assert_eq!(from_pickle.get(0).map(|r| r.plot_type.as_str()), Some("histogram"));
    assert_eq!(from_pickle.get(1).map(|r| r.description.as_str()), Some("BMI vs. age"));
}

#[test]
fn test_corrupt_artifact_is_deserialization_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plots.pkl");
    std::fs::write(&path, b"definitely not a pickle").unwrap();

    let err = PlotList::load(&path, None).unwrap_err();
    assert!(matches!(err, ReportError::Deserialization(..)));

    // An HTML file forced through the JSON decoder
    let err = PlotList::load(&fixture_path("report_template.html"), Some(ArtifactFormat::Json))
        .unwrap_err();
    assert!(matches!(err, ReportError::Deserialization(..)));
}

#[test]
fn test_missing_inputs_are_not_found() {
    let missing = fixture_path("does_not_exist.pkl");

    assert!(matches!(
        PlotList::load(&missing, None),
        Err(ReportError::FileNotFound(_))
    ));
    assert!(matches!(
        Template::load(&missing),
        Err(ReportError::FileNotFound(_))
    ));
}

#[test]
fn test_non_utf8_template_is_encoding_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("template.html");
    std::fs::write(&path, [0x3c, 0x70, 0x3e, 0xff, 0xfe]).unwrap();

    assert!(matches!(
        Template::load(&path),
        Err(ReportError::Encoding(_))
    ));
}

#[test]
fn test_renderer_writes_report() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("diabetes_analysis_report.html");
    std::fs::write(&output, "stale report").unwrap();

    let summary = ReportRenderer::new(
        fixture_path("plots_with_base64.pkl"),
        fixture_path("report_template.html"),
        &output,
    )
    .run()
    .expect("Failed to render report");

    assert_eq!(summary.records, 2);
    assert_eq!(summary.substituted, 4);
    assert!(summary.unresolved.is_empty());
    assert_eq!(summary.output, output);

    let written = std::fs::read_to_string(&output).unwrap();
    insta::assert_snapshot!(written.trim_end(), @r#"
<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <title>Diabetes analysis</title>
</head>
<body>
  <figure>
    <img src="data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==" />
    <figcaption>Distribution of glucose levels</figcaption>
  </figure>
  <figure>
    <img src="data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==" />
    <figcaption>BMI vs. age</figcaption>
  </figure>
</body>
</html>
"#);
}

#[test]
fn test_renderer_fails_before_writing_on_bad_input() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("report.html");

    let err = ReportRenderer::new(
        fixture_path("missing.json"),
        fixture_path("report_template.html"),
        &output,
    )
    .run()
    .unwrap_err();

    assert!(matches!(err, ReportError::FileNotFound(_)));
    assert!(!output.exists());
}

#[test]
fn test_unwritable_output_is_write_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("no_such_dir").join("report.html");

    let err = ReportRenderer::new(
        fixture_path("plots.json"),
        fixture_path("report_template.html"),
        &output,
    )
    .run()
    .unwrap_err();

    assert!(matches!(err, ReportError::Write(..)));
}
