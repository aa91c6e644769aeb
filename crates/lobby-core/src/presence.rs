//! Connected viewers and the session each one reports being inside.
//!
//! Back-references are session names, not pointers; the registry is the
//! authority on which viewers exist, and the directory is the authority on
//! which sessions exist.

use std::collections::BTreeMap;

use lobby_types::{SessionName, ViewerId};

/// A connected viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    /// Connection identifier.
    pub id: ViewerId,
    /// Session the viewer currently reports, if any.
    pub session: Option<SessionName>,
}

/// All connected viewers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceRegistry {
    viewers: BTreeMap<ViewerId, Viewer>,
}

impl PresenceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a viewer with no session, replacing any existing entry.
    /// Returns the replaced viewer.
    pub fn join(&mut self, id: ViewerId) -> Option<Viewer> {
        self.viewers.insert(
            id.clone(),
            Viewer {
                id,
                session: None,
            },
        )
    }

    /// Remove a viewer, returning its last state.
    pub fn leave(&mut self, id: &str) -> Option<Viewer> {
        self.viewers.remove(id)
    }

    /// Look up a viewer.
    pub fn get(&self, id: &str) -> Option<&Viewer> {
        self.viewers.get(id)
    }

    /// Session a viewer reports, if the viewer exists and reports one.
    pub fn session_of(&self, id: &str) -> Option<&SessionName> {
        self.viewers.get(id).and_then(|viewer| viewer.session.as_ref())
    }

    /// Point a viewer at a session (or at none). Returns `false` if the
    /// viewer is unknown.
    pub fn set_session(&mut self, id: &str, session: Option<SessionName>) -> bool {
        match self.viewers.get_mut(id) {
            Some(viewer) => {
                viewer.session = session;
                true
            }
            None => false,
        }
    }

    /// Clear a viewer's back-reference only if it still points at `session`.
    pub fn clear_session_if(&mut self, id: &str, session: &str) {
        if let Some(viewer) = self.viewers.get_mut(id)
            && viewer
                .session
                .as_ref()
                .is_some_and(|current| current.as_str() == session)
        {
            viewer.session = None;
        }
    }

    /// Whether the viewer is connected.
    pub fn contains(&self, id: &str) -> bool {
        self.viewers.contains_key(id)
    }

    /// Number of connected viewers.
    pub fn len(&self) -> usize {
        self.viewers.len()
    }

    /// Whether nobody is connected.
    pub fn is_empty(&self) -> bool {
        self.viewers.is_empty()
    }

    /// Viewers in the lobby who are not inside any session.
    pub fn idle_count(&self) -> usize {
        self.viewers
            .values()
            .filter(|viewer| viewer.session.is_none())
            .count()
    }

    /// All viewers in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Viewer> {
        self.viewers.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_and_leave() {
        let mut registry = PresenceRegistry::new();
        assert!(registry.join(ViewerId::from("v1")).is_none());
        assert!(registry.contains("v1"));
        assert_eq!(registry.len(), 1);

        let left = registry.leave("v1");
        assert_eq!(left.map(|v| v.id), Some(ViewerId::from("v1")));
        assert!(registry.is_empty());
        assert!(registry.leave("v1").is_none());
    }

    #[test]
    fn duplicate_join_replaces() {
        let mut registry = PresenceRegistry::new();
        registry.join(ViewerId::from("v1"));
        registry.set_session("v1", Some(SessionName::from("Alpha")));

        let replaced = registry.join(ViewerId::from("v1"));
        assert_eq!(
            replaced.and_then(|v| v.session),
            Some(SessionName::from("Alpha"))
        );
        assert_eq!(registry.session_of("v1"), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn clear_session_only_when_matching() {
        let mut registry = PresenceRegistry::new();
        registry.join(ViewerId::from("v1"));
        registry.set_session("v1", Some(SessionName::from("B")));

        registry.clear_session_if("v1", "A");
        assert_eq!(registry.session_of("v1"), Some(&SessionName::from("B")));
        registry.clear_session_if("v1", "B");
        assert_eq!(registry.session_of("v1"), None);
    }

    #[test]
    fn idle_count_excludes_viewers_in_sessions() {
        let mut registry = PresenceRegistry::new();
        for id in ["a", "b", "c"] {
            registry.join(ViewerId::from(id));
        }
        registry.set_session("b", Some(SessionName::from("Alpha")));
        assert_eq!(registry.idle_count(), 2);
        assert!(!registry.set_session("zzz", None));
    }
}
