use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use stage_funnel::config::Config;
use stage_funnel::host::RecordingHost;
use stage_funnel::layout_dump::LayoutDump;
use stage_funnel::{
    ConfigPatch, Gesture, MessageChannel, MessageSink, RenderRequest, SankeyVis, Surface,
    VisMessage,
};

fn load_request(name: &str) -> RenderRequest {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    let input = std::fs::read_to_string(&path).expect("fixture read failed");
    RenderRequest::from_json(&input).expect("fixture parse failed")
}

fn fast_config() -> Config {
    let mut config = Config::default();
    config.layout.fast_text_metrics = true;
    config
}

struct Harness {
    vis: SankeyVis,
    surface: Surface,
    channel: MessageChannel,
    host: Rc<RecordingHost>,
    done: Rc<Cell<usize>>,
}

impl Harness {
    fn new() -> Self {
        let channel = MessageChannel::new();
        let host = Rc::new(RecordingHost::new());
        let mut vis = SankeyVis::new(fast_config(), channel.clone());
        let mut surface = Surface::new(960.0, 540.0);
        vis.create(&mut surface, Some(host.clone() as Rc<dyn MessageSink>));
        Self {
            vis,
            surface,
            channel,
            host,
            done: Rc::new(Cell::new(0)),
        }
    }

    fn render(&mut self, request: &RenderRequest) {
        let done = Rc::clone(&self.done);
        self.vis.update_async(
            request,
            &mut self.surface,
            Some(self.host.clone()),
            move || done.set(done.get() + 1),
        );
    }
}

#[test]
fn render_all_fixtures() {
    for name in ["basic.json", "funnel.json"] {
        let mut harness = Harness::new();
        harness.render(&load_request(name));
        let svg = harness.surface.content();
        assert!(svg.contains("<svg"), "{name}: missing <svg tag");
        assert!(svg.contains("</svg>"), "{name}: missing </svg tag");
        assert_eq!(harness.done.get(), 1, "{name}: done not signalled once");
    }
}

#[test]
fn basic_fixture_merges_outcomes_under_one_source() {
    let mut harness = Harness::new();
    harness.render(&load_request("basic.json"));
    let frame = harness.vis.last_frame().unwrap();

    let names: Vec<&str> = frame.graph.nodes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["X", "No Bid", "Bid OK"]);
    assert_eq!(frame.layout.nodes[0].value, 15.0);
    let percentages: Vec<&str> = frame.labels.iter().map(|l| l.percentage.as_str()).collect();
    assert_eq!(percentages, vec!["100%", "~33%", "~67%"]);
    assert!(frame.affordances.is_empty());
}

#[test]
fn funnel_fixture_labels_and_detail_selection() {
    let mut harness = Harness::new();
    harness.render(&load_request("funnel.json"));
    let frame = harness.vis.last_frame().unwrap();

    let unmatched = frame
        .labels
        .iter()
        .find(|label| label.name == "Targeting Unmatched")
        .unwrap();
    assert!(unmatched.selected);
    assert_eq!(unmatched.percentage, "~28%");
    assert_eq!(unmatched.value_text, "2.5K");
    assert!(harness.surface.content().contains("Hide Details"));
    assert!(harness.surface.content().contains("Show Details"));
    assert_eq!(frame.hide_column.as_ref().unwrap().dimension, "funnel.eligibility");
}

#[test]
fn missing_measure_is_an_early_return() {
    let mut harness = Harness::new();
    harness.render(&load_request("missing_measure.json"));
    assert_eq!(harness.done.get(), 1);
    assert!(harness.surface.is_empty());
    assert!(harness.vis.last_frame().is_none());
    assert_eq!(harness.channel.listener_count(), 0);
}

#[test]
fn hosted_session_round_trip() {
    let mut harness = Harness::new();
    let mut request = load_request("funnel.json");
    assert_eq!(harness.host.take_messages(), vec![VisMessage::handshake()]);

    harness.render(&request);
    assert!(harness.vis.handle_gesture(&Gesture::HideColumn));
    for patch in harness.host.take_patches() {
        request.config.apply(&patch);
    }
    harness.render(&request);
    let frame = harness.vis.last_frame().unwrap();
    assert_eq!(frame.guides.columns.len(), 2);
    assert!(frame.show_more.is_some());

    // Host clears the selection from outside the chart.
    assert_eq!(harness.channel.broadcast(&VisMessage::ClearSelectedStage), 1);
    let patches = harness.host.take_patches();
    assert_eq!(patches, vec![ConfigPatch::selected_detail_stage("")]);
    for patch in &patches {
        request.config.apply(patch);
    }
    harness.render(&request);
    assert!(!harness.surface.content().contains("Hide Details"));

    assert!(harness.vis.handle_gesture(&Gesture::ShowMore));
    for patch in harness.host.take_patches() {
        request.config.apply(&patch);
    }
    assert!(request.config.hidden_dimensions.is_empty());
    assert_eq!(harness.done.get(), 3);
    assert_eq!(harness.channel.listener_count(), 1);
}

#[test]
fn layout_dump_serializes_frame() {
    let mut harness = Harness::new();
    harness.render(&load_request("basic.json"));
    let dump = LayoutDump::from_frame(harness.vis.last_frame().unwrap());
    let json = serde_json::to_value(&dump).unwrap();
    assert_eq!(json["nodes"].as_array().unwrap().len(), 3);
    assert_eq!(json["links"][0]["source"], "X01");
    assert_eq!(json["columns"][0], "a");
}
