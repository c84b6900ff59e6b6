//! The hosted chart component: mount, render on every host update, and turn
//! gestures on the last render into configuration requests.

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::derive::{
    column_guides, place_labels, spill_cover_bounds, ColumnGuides, NodeLabel, Rect, SpillCovers,
};
use crate::graph;
use crate::host::{
    post_message, request_update, validate, HostBridge, MessageChannel, MessageSink,
    Subscription, ValidationError, VisMessage,
};
use crate::interaction::{
    clear_selection, columns, hide_affordance, hide_dimension, show_more, show_more_available,
    toggle_detail, Gesture, VisConfig,
};
use crate::ir::{Graph, QueryFields, QueryResponse, Row};
use crate::layout::{Extent, FlowLayout, LayoutEngine};
use crate::normalize::{normalize_rows, visible_dimensions};
use crate::render::render_svg;
use crate::text_metrics::TextMeasure;

/// Everything the host hands over on an update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    #[serde(default)]
    pub data: Vec<Row>,
    #[serde(default)]
    pub config: VisConfig,
    #[serde(default)]
    pub query_response: QueryResponse,
    #[serde(default)]
    pub details: serde_json::Value,
}

impl RenderRequest {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Drawing target owned by the host. Content is the last drawn SVG document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Surface {
    pub width: f64,
    pub height: f64,
    content: String,
}

impl Surface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            content: String::new(),
        }
    }

    pub fn clear(&mut self) {
        self.content.clear();
    }

    pub fn draw(&mut self, svg: String) {
        self.content = svg;
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HideColumn {
    pub dimension: String,
    pub bounds: Rect,
}

/// Clickable region of the last render and the gesture it maps to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Affordance {
    pub gesture: Gesture,
    pub bounds: Rect,
}

/// One render's worth of derived state, kept as the snapshot gestures
/// resolve against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub width: f64,
    pub height: f64,
    pub config: VisConfig,
    pub graph: Graph,
    pub layout: FlowLayout,
    pub guides: ColumnGuides,
    pub labels: Vec<NodeLabel>,
    pub spill: Option<SpillCovers>,
    pub hide_column: Option<HideColumn>,
    pub show_more: Option<Rect>,
    pub affordances: Vec<Affordance>,
}

impl Frame {
    pub fn selected_stage(&self) -> &str {
        &self.config.selected_detail_stage
    }

    pub fn hit_test(&self, x: f64, y: f64) -> Option<&Gesture> {
        self.affordances
            .iter()
            .rev()
            .find(|affordance| affordance.bounds.contains(x, y))
            .map(|affordance| &affordance.gesture)
    }

    /// Nothing to draw: no links and no way back to hidden columns.
    pub fn is_blank(&self) -> bool {
        self.graph.is_empty() && self.show_more.is_none()
    }

    fn offers(&self, gesture: &Gesture) -> bool {
        self.affordances
            .iter()
            .any(|affordance| &affordance.gesture == gesture)
    }
}

/// Normalize, build, lay out and derive. Pure; nothing is drawn.
#[allow(clippy::too_many_arguments)]
pub fn build_frame(
    data: &[Row],
    fields: &QueryFields,
    vis_config: &VisConfig,
    width: f64,
    height: f64,
    config: &Config,
    engine: &dyn LayoutEngine,
    measure: &dyn TextMeasure,
) -> Result<Frame, ValidationError> {
    validate(fields)?;
    let measure_field = fields
        .measure_like
        .first()
        .ok_or(ValidationError::MeasureCount(0))?;
    let layout_cfg = &config.layout;
    let catalog = &config.stages;

    let visible = visible_dimensions(&fields.dimension_like, &vis_config.hidden_dimensions);
    let columns = columns(&visible);
    let paths = normalize_rows(data, &visible, measure_field, catalog);
    let graph = graph::build(&paths, catalog);

    let extent = Extent::new(
        layout_cfg.margin_left,
        layout_cfg.vertical_margin,
        width - layout_cfg.margin_right,
        height - 2.0 * layout_cfg.vertical_margin,
    );
    let layout = engine.layout(&graph, extent);
    let guides = column_guides(&columns, width, height, layout_cfg);
    let labels = place_labels(
        &graph,
        &layout,
        &vis_config.selected_detail_stage,
        width,
        catalog,
        layout_cfg,
        measure,
    );
    let spill = spill_cover_bounds(&graph, &layout, width);

    let drawable = !graph.is_empty();
    let hide_column = hide_affordance(&columns)
        .filter(|_| drawable)
        .map(|dimension| HideColumn {
        dimension: dimension.name.clone(),
            bounds: Rect::new(
                layout_cfg.margin_left,
                0.0,
                guides.column_width + layout_cfg.node_width - 2.0,
                height - layout_cfg.vertical_margin,
            ),
        });
    let show_more = show_more_available(vis_config).then(|| {
        Rect::new(
            2.0,
            layout_cfg.vertical_margin - layout_cfg.bar_extension,
            layout_cfg.node_width,
            height - 2.0 * layout_cfg.vertical_margin - layout_cfg.bar_extension / 2.0,
        )
    });

    // Show-more stays offered on an empty graph so hidden columns can
    // always be restored.
    let mut affordances = Vec::new();
    if let Some(hide) = &hide_column {
        affordances.push(Affordance {
            gesture: Gesture::HideColumn,
            bounds: hide.bounds,
        });
    }
    if let Some(bounds) = show_more {
        affordances.push(Affordance {
            gesture: Gesture::ShowMore,
            bounds,
        });
    }
    for label in labels.iter().filter(|label| label.visible) {
        if let Some(button) = &label.detail_button {
            affordances.push(Affordance {
                gesture: Gesture::ToggleDetail {
                    stage: button.stage.clone(),
                },
                bounds: button.bounds,
            });
        }
    }

    Ok(Frame {
        width,
        height,
        config: vis_config.clone(),
        graph,
        layout,
        guides,
        labels,
        spill,
        hide_column,
        show_more,
        affordances,
    })
}

/// Calls the completion callback when dropped, so every exit path of a
/// render signals the host exactly once.
struct Completion<F: FnOnce()> {
    done: Option<F>,
}

impl<F: FnOnce()> Completion<F> {
    fn new(done: F) -> Self {
        Self { done: Some(done) }
    }
}

impl<F: FnOnce()> Drop for Completion<F> {
    fn drop(&mut self) {
        if let Some(done) = self.done.take() {
            done();
        }
    }
}

pub struct SankeyVis {
    config: Config,
    engine: Box<dyn LayoutEngine>,
    measure: Box<dyn TextMeasure>,
    channel: MessageChannel,
    subscription: Option<Subscription>,
    sink: Option<Rc<dyn MessageSink>>,
    bridge: Option<Rc<dyn HostBridge>>,
    mounted: bool,
    last_frame: Option<Frame>,
}

impl SankeyVis {
    pub fn new(config: Config, channel: MessageChannel) -> Self {
        let engine = Box::new(config.layout_engine());
        Self::with_engine(config, channel, engine)
    }

    pub fn with_engine(
        config: Config,
        channel: MessageChannel,
        engine: Box<dyn LayoutEngine>,
    ) -> Self {
        let measure = config.text_measure();
        Self {
            config,
            engine,
            measure,
            channel,
            subscription: None,
            sink: None,
            bridge: None,
            mounted: false,
            last_frame: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mounts onto `surface` and announces the chart to the enclosing
    /// context. Later calls are no-ops.
    pub fn create(&mut self, surface: &mut Surface, sink: Option<Rc<dyn MessageSink>>) {
        if self.mounted {
            debug!("already mounted");
            return;
        }
        surface.clear();
        self.mounted = true;
        self.sink = sink;
        post_message(self.sink.as_deref(), &VisMessage::handshake());
        info!(width = surface.width, height = surface.height, "mounted");
    }

    /// Renders `request` onto `surface`. `done` runs exactly once whatever
    /// the outcome.
    pub fn update_async(
        &mut self,
        request: &RenderRequest,
        surface: &mut Surface,
        bridge: Option<Rc<dyn HostBridge>>,
        done: impl FnOnce(),
    ) {
        let _completion = Completion::new(done);
        debug!(
            rows = request.data.len(),
            hidden = request.config.hidden_dimensions.len(),
            selected = %request.config.selected_detail_stage,
            "render requested"
        );

        let frame = match build_frame(
            &request.data,
            &request.query_response.fields,
            &request.config,
            surface.width,
            surface.height,
            &self.config,
            self.engine.as_ref(),
            self.measure.as_ref(),
        ) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(%err, "unsupported query shape, skipping render");
                return;
            }
        };

        self.subscription = None;
        let listener_bridge = bridge.clone();
        self.subscription = Some(self.channel.subscribe(move |message| {
            if *message == VisMessage::ClearSelectedStage {
                debug!("clear selection received");
                request_update(listener_bridge.as_deref(), clear_selection());
            }
        }));
        self.bridge = bridge;

        surface.clear();
        if frame.is_blank() {
            debug!("no links to draw");
        } else {
            surface.draw(render_svg(&frame, &self.config));
        }
        debug!(
            nodes = frame.graph.nodes.len(),
            links = frame.graph.links.len(),
            "render complete"
        );
        self.last_frame = Some(frame);
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.last_frame.as_ref()
    }

    pub fn affordances(&self) -> &[Affordance] {
        self.last_frame
            .as_ref()
            .map(|frame| frame.affordances.as_slice())
            .unwrap_or_default()
    }

    pub fn hit_test(&self, x: f64, y: f64) -> Option<Gesture> {
        self.last_frame.as_ref()?.hit_test(x, y).cloned()
    }

    /// Pointer click at canvas coordinates. Returns whether a request was
    /// issued.
    pub fn click(&self, x: f64, y: f64) -> bool {
        match self.hit_test(x, y) {
            Some(gesture) => self.handle_gesture(&gesture),
            None => false,
        }
    }

    /// Resolves `gesture` against the last render's configuration. Gestures
    /// the last render did not offer are ignored.
    pub fn handle_gesture(&self, gesture: &Gesture) -> bool {
        let Some(frame) = self.last_frame.as_ref() else {
            debug!(?gesture, "no render yet, ignoring gesture");
            return false;
        };
        if !frame.offers(gesture) {
            debug!(?gesture, "gesture not offered by last render");
            return false;
        }
        let bridge = self.bridge.as_deref();
        match gesture {
            Gesture::HideColumn => match &frame.hide_column {
                Some(hide) => request_update(bridge, hide_dimension(&frame.config, &hide.dimension)),
                None => false,
            },
            Gesture::ShowMore => match show_more(&frame.config) {
                Some(patch) => request_update(bridge, patch),
                None => false,
            },
            Gesture::ToggleDetail { stage } => {
                match toggle_detail(&frame.config, stage, &self.config.stages) {
                    Some(toggle) => {
                        post_message(self.sink.as_deref(), &toggle.message);
                        request_update(bridge, toggle.patch)
                    }
                    None => false,
                }
            }
        }
    }
}
