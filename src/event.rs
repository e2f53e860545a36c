//! Render failure signals
//!
//! The orchestrator never returns errors past its boundary. Instead it
//! dispatches one of these events on the root of the live tree it was
//! rendering into, so observers can react without a callback registry.

use std::fmt;

/// Emitter type carried by every event of this crate.
pub const EMITTER_TYPE: &str = "tola-reconcile/reconciler";

/// Who raised a render event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Emitter {
    /// Emitter type, always [`EMITTER_TYPE`] for events raised here
    pub kind: &'static str,
    /// Name of the reconciler that failed
    pub id: String,
}

impl Emitter {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            kind: EMITTER_TYPE,
            id: id.into(),
        }
    }
}

impl fmt::Display for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

/// Render failure notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderEvent {
    /// The edit script could not be computed; the live tree is untouched
    DiffFailed { emitter: Emitter },
    /// The edit script stopped part way; earlier operations stay applied
    ApplyFailed { emitter: Emitter },
}

impl RenderEvent {
    pub fn diff_failed(id: impl Into<String>) -> Self {
        Self::DiffFailed {
            emitter: Emitter::new(id),
        }
    }

    pub fn apply_failed(id: impl Into<String>) -> Self {
        Self::ApplyFailed {
            emitter: Emitter::new(id),
        }
    }

    /// Event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DiffFailed { .. } => "TemplateDiffErrorEvent",
            Self::ApplyFailed { .. } => "TemplateRenderErrorEvent",
        }
    }

    pub fn emitter(&self) -> &Emitter {
        match self {
            Self::DiffFailed { emitter } | Self::ApplyFailed { emitter } => emitter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_event() {
        let event = RenderEvent::apply_failed("menu");
        assert_eq!(event.name(), "TemplateRenderErrorEvent");
        assert_eq!(event.emitter().id, "menu");
        assert_eq!(event.emitter().kind, EMITTER_TYPE);
        assert_eq!(event.emitter().to_string(), "tola-reconcile/reconciler#menu");
        assert_ne!(event, RenderEvent::diff_failed("menu"));
    }
}
