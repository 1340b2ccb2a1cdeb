use std::collections::HashMap;

use crate::models::Source;

/// Maps a bucket/container identifier to the backend that owns it.
///
/// Explicit registrations always win. Unregistered identifiers fall back to a
/// caller hint if one is given, and only then to the naming heuristic: a `.`
/// in the identifier suggests an Azure container, anything else is S3. The
/// heuristic misroutes unusual names, so every configured container should be
/// registered.
#[derive(Debug, Clone, Default)]
pub struct SourceRouter {
    registrations: HashMap<String, Source>,
    order: Vec<String>,
}

impl SourceRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `identifier` as owned by `source`, replacing any earlier entry.
    pub fn register(&mut self, identifier: impl Into<String>, source: Source) -> &mut Self {
        let identifier = identifier.into();
        if self.registrations.insert(identifier.clone(), source).is_none() {
            self.order.push(identifier);
        }
        self
    }

    /// Builder-style variant of [`SourceRouter::register`].
    pub fn with(mut self, identifier: impl Into<String>, source: Source) -> Self {
        self.register(identifier, source);
        self
    }

    /// Returns the explicitly registered source, if any.
    pub fn registered(&self, identifier: &str) -> Option<Source> {
        self.registrations.get(identifier).copied()
    }

    /// Registered identifiers with their sources, in registration order.
    pub fn registrations(&self) -> impl Iterator<Item = (&str, Source)> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.registrations.get(id).map(|s| (id.as_str(), *s)))
    }

    /// Routes an identifier using registration, then the naming heuristic.
    pub fn route(&self, identifier: &str) -> Source {
        self.route_with_hint(identifier, None)
    }

    /// Routes an identifier using registration, then `hint`, then the heuristic.
    pub fn route_with_hint(&self, identifier: &str, hint: Option<Source>) -> Source {
        if let Some(source) = self.registered(identifier) {
            return source;
        }
        if let Some(source) = hint {
            return source;
        }
        let guessed = heuristic_source(identifier);
        tracing::warn!(
            identifier,
            source = %guessed,
            "routing unregistered container by naming heuristic"
        );
        guessed
    }
}

fn heuristic_source(identifier: &str) -> Source {
    if identifier.contains('.') {
        Source::Azure
    } else {
        Source::S3
    }
}
