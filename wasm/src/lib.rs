use std::rc::Rc;

use js_sys::Function;
use stage_funnel::config::{Config, parse_config};
use stage_funnel::{
    ConfigPatch, HostBridge, MessageChannel, MessageSink, RenderRequest, SankeyVis, Surface,
    VisMessage,
};
use wasm_bindgen::prelude::*;

/// JS callback receiving a JSON string argument.
struct JsCallback(Function);

impl JsCallback {
    fn send(&self, json: String) {
        let _ = self.0.call1(&JsValue::NULL, &JsValue::from_str(&json));
    }
}

impl HostBridge for JsCallback {
    fn request_config_update(&self, patch: ConfigPatch) {
        self.send(patch.to_json());
    }
}

impl MessageSink for JsCallback {
    fn post_message(&self, message: &VisMessage) {
        self.send(message.to_json());
    }
}

fn call_done(done: Option<&Function>) {
    if let Some(done) = done {
        let _ = done.call0(&JsValue::NULL);
    }
}

fn build_config(config_json: Option<&str>) -> anyhow::Result<Config> {
    let mut config = match config_json {
        Some(raw) => parse_config(raw)?,
        None => Config::default(),
    };
    // No system font database in the browser sandbox.
    config.layout.fast_text_metrics = true;
    Ok(config)
}

#[wasm_bindgen]
pub struct SankeyVisualization {
    vis: SankeyVis,
    surface: Surface,
    channel: MessageChannel,
}

#[wasm_bindgen]
impl SankeyVisualization {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<SankeyVisualization, JsValue> {
        let config = build_config(config_json.as_deref())
            .map_err(|error| JsValue::from_str(&error.to_string()))?;
        let channel = MessageChannel::new();
        Ok(Self {
            vis: SankeyVis::new(config, channel.clone()),
            surface: Surface::default(),
            channel,
        })
    }

    /// Mounts the chart. `post_message` receives outgoing messages as JSON.
    pub fn create(&mut self, width: f64, height: f64, post_message: Option<Function>) {
        self.surface = Surface::new(width, height);
        let sink = post_message.map(|f| Rc::new(JsCallback(f)) as Rc<dyn MessageSink>);
        self.vis.create(&mut self.surface, sink);
    }

    /// Renders a `{data, config, queryResponse}` request and returns the SVG
    /// (empty when nothing is drawn). `done` is called exactly once, also
    /// when the request fails to parse.
    #[wasm_bindgen(js_name = updateAsync)]
    pub fn update_async(
        &mut self,
        request_json: &str,
        width: f64,
        height: f64,
        trigger: Option<Function>,
        done: Option<Function>,
    ) -> Result<String, JsValue> {
        let request = match RenderRequest::from_json(request_json) {
            Ok(request) => request,
            Err(error) => {
                call_done(done.as_ref());
                return Err(JsValue::from_str(&error.to_string()));
            }
        };
        self.surface.width = width;
        self.surface.height = height;
        let bridge = trigger.map(|f| Rc::new(JsCallback(f)) as Rc<dyn HostBridge>);
        self.vis
            .update_async(&request, &mut self.surface, bridge, || call_done(done.as_ref()));
        Ok(self.surface.content().to_string())
    }

    /// Delivers a message from the enclosing context. Returns whether it was
    /// recognized.
    #[wasm_bindgen(js_name = handleMessage)]
    pub fn handle_message(&self, message_json: &str) -> bool {
        match VisMessage::parse(message_json) {
            Some(message) => {
                self.channel.broadcast(&message);
                true
            }
            None => false,
        }
    }

    pub fn click(&self, x: f64, y: f64) -> bool {
        self.vis.click(x, y)
    }

    pub fn svg(&self) -> String {
        self.surface.content().to_string()
    }
}
