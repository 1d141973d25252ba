//! Host environment queries that influence which panel view is shown.

/// Route fragment identifying the generation page.
pub const GENERATION_ROUTE_FRAGMENT: &str = "generate";

/// What the store needs to know about where it is running.
pub trait Environment: Send + Sync {
    /// Small screens only have room for the generate view.
    fn is_compact_viewport(&self) -> bool;

    /// Whether the current location is the generation page.
    fn is_on_generation_route(&self) -> bool;
}

/// Fixed viewport and route, e.g. from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    pub compact_viewport: bool,
    pub route: String,
}

impl StaticEnvironment {
    pub fn new(compact_viewport: bool, route: impl Into<String>) -> Self {
        Self {
            compact_viewport,
            route: route.into(),
        }
    }
}

impl Environment for StaticEnvironment {
    fn is_compact_viewport(&self) -> bool {
        self.compact_viewport
    }

    fn is_on_generation_route(&self) -> bool {
        self.route.contains(GENERATION_ROUTE_FRAGMENT)
    }
}
