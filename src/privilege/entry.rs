use super::registry::Tagged;

/// A registered permission key.
///
/// Only [`Manager::create_entry`](super::Manager::create_entry) builds these,
/// so every entry a caller can see is registered in exactly one manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    id: i64,
    tag: String,
    brief: String,
}

impl Entry {
    pub(crate) fn new(id: i64, tag: String) -> Self {
        Self { id, tag, brief: String::new() }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Short description shown to operators. Empty unless set.
    pub fn brief(&self) -> &str {
        &self.brief
    }

    pub(crate) fn set_brief(&mut self, brief: String) {
        self.brief = brief;
    }
}

impl Tagged for Entry {
    fn id(&self) -> i64 {
        self.id
    }

    fn tag(&self) -> &str {
        &self.tag
    }

    fn set_tag(&mut self, tag: String) {
        self.tag = tag;
    }
}
