//! Rendering boundary.
//!
//! The engine does not draw anything. It pushes each outcome, together with
//! the view declared for the node, to whatever sinks the session has.

mod sink;
mod view;

pub use sink::{
    Frame, FrameRecord, JsonLinesSink, MsgPackSink, RecordingSink, RenderSink, Severity, TextSink,
};
pub use view::{ChartKind, ChartSpec, View};
