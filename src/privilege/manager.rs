//! One privilege namespace: entries, classes and units plus resolution.

use std::any::Any;

use super::class::Class;
use super::decision::Decision;
use super::entry::Entry;
use super::error::{check_tag, PrivilegeError, Result};
use super::registry::Registry;
use super::unit::{Subject, Unit};
use super::ManagerId;

/// Owns every entry, class and unit of one namespace.
///
/// Objects refer to each other by id only. A unit's class id always names a
/// live class, and a unit id is in exactly one class roster: the one its class
/// id names.
#[derive(Debug)]
pub struct Manager {
    id: ManagerId,
    name: String,
    entries: Registry<Entry>,
    classes: Registry<Class>,
    units: Registry<Unit>,
}

impl Manager {
    pub(crate) fn new(id: ManagerId, name: String) -> Self {
        Self {
            id,
            name,
            entries: Registry::new(),
            classes: Registry::new(),
            units: Registry::new(),
        }
    }

    pub fn id(&self) -> ManagerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ------------------------------------------------------------------
    // Entries
    // ------------------------------------------------------------------

    pub fn entry(&self, id: i64) -> Option<&Entry> {
        self.entries.get(id)
    }

    pub fn entry_by_tag(&self, tag: &str) -> Result<Option<&Entry>> {
        check_tag("entry", tag)?;
        Ok(self.entries.by_tag(tag))
    }

    /// Create-if-missing. An existing entry is returned untouched and `tag`
    /// is ignored.
    pub fn create_entry(&mut self, id: i64, tag: &str) -> Result<&Entry> {
        check_tag("entry", tag)?;
        if self.entries.contains(id) {
            let entry = self.entries.get(id).ok_or(PrivilegeError::UnknownEntry(id))?;
            if entry.tag() != tag {
                tracing::warn!(
                    "[privilege] {}: entry {id} already exists as {:?}, ignoring tag {tag:?}",
                    self.name,
                    entry.tag()
                );
            }
            return Ok(entry);
        }
        tracing::debug!("[privilege] {}: new entry id={id} tag={tag:?}", self.name);
        Ok(&*self.entries.insert(Entry::new(id, tag.to_owned())))
    }

    pub fn set_entry_brief(&mut self, id: i64, brief: &str) -> Result<()> {
        let entry = self.entries.get_mut(id).ok_or(PrivilegeError::UnknownEntry(id))?;
        entry.set_brief(brief.to_owned());
        Ok(())
    }

    pub fn set_entry_tag(&mut self, id: i64, tag: &str) -> Result<()> {
        check_tag("entry", tag)?;
        self.entries
            .retag(id, tag.to_owned())
            .map(|_| ())
            .ok_or(PrivilegeError::UnknownEntry(id))
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> + '_ {
        self.entries.iter()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    // ------------------------------------------------------------------
    // Classes
    // ------------------------------------------------------------------

    pub fn class(&self, id: i64) -> Option<&Class> {
        self.classes.get(id)
    }

    pub fn class_by_tag(&self, tag: &str) -> Result<Option<&Class>> {
        check_tag("class", tag)?;
        Ok(self.classes.by_tag(tag))
    }

    /// Create-if-missing, same rules as [`Manager::create_entry`].
    pub fn create_class(&mut self, id: i64, tag: &str) -> Result<&Class> {
        check_tag("class", tag)?;
        if self.classes.contains(id) {
            let class = self.classes.get(id).ok_or(PrivilegeError::UnknownClass(id))?;
            if class.tag() != tag {
                tracing::warn!(
                    "[privilege] {}: class {id} already exists as {:?}, ignoring tag {tag:?}",
                    self.name,
                    class.tag()
                );
            }
            return Ok(class);
        }
        tracing::debug!("[privilege] {}: new class id={id} tag={tag:?}", self.name);
        Ok(&*self.classes.insert(Class::new(id, tag.to_owned())))
    }

    pub fn set_class_tag(&mut self, id: i64, tag: &str) -> Result<()> {
        check_tag("class", tag)?;
        self.classes
            .retag(id, tag.to_owned())
            .map(|_| ())
            .ok_or(PrivilegeError::UnknownClass(id))
    }

    /// Make `class` inherit from `parent`, or from nothing.
    pub fn set_class_parent(&mut self, class: i64, parent: Option<i64>) -> Result<()> {
        if !self.classes.contains(class) {
            return Err(PrivilegeError::UnknownClass(class));
        }
        if let Some(p) = parent {
            if !self.classes.contains(p) {
                return Err(PrivilegeError::UnknownClass(p));
            }
            if self.lineage(p).any(|c| c.id() == class) {
                return Err(PrivilegeError::ClassCycle { class, parent: p });
            }
        }
        if let Some(c) = self.classes.get_mut(class) {
            c.set_parent(parent);
        }
        tracing::debug!("[privilege] {}: class {class} parent={parent:?}", self.name);
        Ok(())
    }

    /// `class` followed by its ancestors, nearest first.
    pub fn lineage(&self, class: i64) -> impl Iterator<Item = &Class> + '_ {
        std::iter::successors(self.classes.get(class), move |c| {
            c.parent().and_then(|p| self.classes.get(p))
        })
        .take(self.classes.len())
    }

    /// Remove an unused class. Fails while units are enlisted or other classes
    /// inherit from it.
    pub fn release_class(&mut self, id: i64) -> Result<()> {
        let class = self.classes.get(id).ok_or(PrivilegeError::UnknownClass(id))?;
        if class.unit_count() > 0 || self.classes.iter().any(|c| c.parent() == Some(id)) {
            return Err(PrivilegeError::ClassInUse(id));
        }
        self.classes.remove(id);
        for unit in self.units.ids().collect::<Vec<_>>() {
            if let Some(u) = self.units.get_mut(unit) {
                u.forget_subject(Subject::Class(id));
            }
        }
        tracing::debug!("[privilege] {}: released class {id}", self.name);
        Ok(())
    }

    pub fn classes(&self) -> impl Iterator<Item = &Class> + '_ {
        self.classes.iter()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Unit `unit` if it is enlisted in `class`.
    pub fn class_unit_by_id(&self, class: i64, unit: i64) -> Option<&Unit> {
        let class = self.classes.get(class)?;
        if class.has_unit(unit) {
            self.units.get(unit)
        } else {
            None
        }
    }

    /// First unit enlisted in `class` whose tag equals `tag`.
    pub fn class_unit_by_tag(&self, class: i64, tag: &str) -> Result<Option<&Unit>> {
        check_tag("unit", tag)?;
        let Some(class) = self.classes.get(class) else {
            return Ok(None);
        };
        Ok(class
            .units()
            .filter_map(|id| self.units.get(id))
            .find(|u| u.tag() == tag))
    }

    /// Move `unit` into `class`. The only path that re-parents a unit.
    ///
    /// Returns false when the unit was already there (nothing changes).
    pub fn add_unit(&mut self, class: i64, unit: i64) -> Result<bool> {
        let current = self
            .units
            .get(unit)
            .ok_or(PrivilegeError::UnknownUnit(unit))?
            .class_id();
        if !self.classes.contains(class) {
            return Err(PrivilegeError::UnknownClass(class));
        }
        if current == class {
            return Ok(false);
        }
        if let Some(old) = self.classes.get_mut(current) {
            old.unlist_unit(unit);
        }
        if let Some(new) = self.classes.get_mut(class) {
            new.enlist_unit(unit);
        }
        if let Some(u) = self.units.get_mut(unit) {
            u.set_class_id(class);
        }
        tracing::debug!("[privilege] {}: unit {unit} moved from class {current} to {class}", self.name);
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Units
    // ------------------------------------------------------------------

    pub fn unit(&self, id: i64) -> Option<&Unit> {
        self.units.get(id)
    }

    pub fn unit_by_tag(&self, tag: &str) -> Result<Option<&Unit>> {
        check_tag("unit", tag)?;
        Ok(self.units.by_tag(tag))
    }

    /// Create-if-missing. A new unit is registered here and enlisted in
    /// `class` together; an existing one is returned untouched and both `class`
    /// and `tag` are ignored.
    pub fn create_unit(&mut self, id: i64, class: i64, tag: &str) -> Result<&Unit> {
        check_tag("unit", tag)?;
        if self.units.contains(id) {
            let unit = self.units.get(id).ok_or(PrivilegeError::UnknownUnit(id))?;
            if unit.tag() != tag {
                tracing::warn!(
                    "[privilege] {}: unit {id} already exists as {:?}, ignoring tag {tag:?}",
                    self.name,
                    unit.tag()
                );
            }
            return Ok(unit);
        }
        let roster = self
            .classes
            .get_mut(class)
            .ok_or(PrivilegeError::UnknownClass(class))?;
        roster.enlist_unit(id);
        tracing::debug!("[privilege] {}: new unit id={id} tag={tag:?} class={class}", self.name);
        Ok(&*self.units.insert(Unit::new(id, tag.to_owned(), class)))
    }

    pub fn set_unit_tag(&mut self, id: i64, tag: &str) -> Result<()> {
        check_tag("unit", tag)?;
        self.units
            .retag(id, tag.to_owned())
            .map(|_| ())
            .ok_or(PrivilegeError::UnknownUnit(id))
    }

    pub fn unit_class(&self, unit: i64) -> Option<&Class> {
        self.units.get(unit).and_then(|u| self.classes.get(u.class_id()))
    }

    /// Re-parent `unit`; see [`Manager::add_unit`].
    pub fn set_unit_class(&mut self, unit: i64, class: i64) -> Result<bool> {
        self.add_unit(class, unit)
    }

    /// Drop a unit from the registry and its class roster together.
    pub fn release_unit(&mut self, id: i64) -> Result<()> {
        let unit = self.units.remove(id).ok_or(PrivilegeError::UnknownUnit(id))?;
        if let Some(class) = self.classes.get_mut(unit.class_id()) {
            class.unlist_unit(id);
        }
        for other in self.units.ids().collect::<Vec<_>>() {
            if let Some(u) = self.units.get_mut(other) {
                u.forget_subject(Subject::Unit(id));
            }
        }
        tracing::debug!("[privilege] {}: released unit {id}", self.name);
        Ok(())
    }

    pub fn units(&self) -> impl Iterator<Item = &Unit> + '_ {
        self.units.iter()
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    // ------------------------------------------------------------------
    // Decisions
    // ------------------------------------------------------------------

    /// Store a unit-local decision. Returns the previous one.
    pub fn set_unit_decision(&mut self, unit: i64, entry: i64, decision: Decision) -> Result<Decision> {
        self.require_entry(entry)?;
        let u = self.units.get_mut(unit).ok_or(PrivilegeError::UnknownUnit(unit))?;
        Ok(u.permissions.set(entry, decision))
    }

    /// Store a class-level decision. Returns the previous one.
    pub fn set_class_decision(&mut self, class: i64, entry: i64, decision: Decision) -> Result<Decision> {
        self.require_entry(entry)?;
        let c = self.classes.get_mut(class).ok_or(PrivilegeError::UnknownClass(class))?;
        Ok(c.permissions.set(entry, decision))
    }

    /// Store a decision on `target` for actions by `subject` using `entry`.
    pub fn set_unit_override(
        &mut self,
        target: i64,
        subject: Subject,
        entry: i64,
        decision: Decision,
    ) -> Result<Decision> {
        self.require_entry(entry)?;
        match subject {
            Subject::Unit(id) if !self.units.contains(id) => return Err(PrivilegeError::UnknownUnit(id)),
            Subject::Class(id) if !self.classes.contains(id) => return Err(PrivilegeError::UnknownClass(id)),
            _ => {}
        }
        let t = self.units.get_mut(target).ok_or(PrivilegeError::UnknownUnit(target))?;
        Ok(t.set_override(subject, entry, decision))
    }

    /// Whether `unit` may use `entry`.
    ///
    /// The unit's own table wins, then its class and each ancestor class in
    /// turn. Nothing explicit anywhere means deny.
    pub fn can(&self, unit: i64, entry: i64) -> Result<bool> {
        self.require_entry(entry)?;
        let unit = self.units.get(unit).ok_or(PrivilegeError::UnknownUnit(unit))?;
        Ok(self.decide(unit, entry))
    }

    /// Whether `actor` may use `entry` against `target`.
    ///
    /// Overrides stored on the target come first: one naming the actor, then
    /// one naming the actor's class or an ancestor of it. Without an override
    /// the actor's own [`Manager::can`] answer applies.
    pub fn can_against(&self, target: i64, entry: i64, actor: i64) -> Result<bool> {
        self.require_entry(entry)?;
        let target = self.units.get(target).ok_or(PrivilegeError::UnknownUnit(target))?;
        let actor = self.units.get(actor).ok_or(PrivilegeError::UnknownUnit(actor))?;
        let allowed = target
            .override_for(Subject::Unit(actor.id()), entry)
            .explicit()
            .or_else(|| {
                self.lineage(actor.class_id())
                    .find_map(|c| target.override_for(Subject::Class(c.id()), entry).explicit())
            })
            .unwrap_or_else(|| self.decide(actor, entry));
        Ok(allowed)
    }

    fn decide(&self, unit: &Unit, entry: i64) -> bool {
        unit.permissions
            .get(entry)
            .explicit()
            .or_else(|| {
                self.lineage(unit.class_id())
                    .find_map(|c| c.permissions.get(entry).explicit())
            })
            .unwrap_or(false)
    }

    fn require_entry(&self, entry: i64) -> Result<()> {
        if self.entries.contains(entry) {
            Ok(())
        } else {
            Err(PrivilegeError::UnknownEntry(entry))
        }
    }

    // ------------------------------------------------------------------
    // Opaque data
    // ------------------------------------------------------------------

    /// Replace the unit's opaque value, returning the old one.
    pub fn set_unit_data(&mut self, unit: i64, value: Option<Box<dyn Any>>) -> Result<Option<Box<dyn Any>>> {
        let u = self.units.get_mut(unit).ok_or(PrivilegeError::UnknownUnit(unit))?;
        Ok(u.data.replace(value))
    }

    pub fn set_class_data(&mut self, class: i64, value: Option<Box<dyn Any>>) -> Result<Option<Box<dyn Any>>> {
        let c = self.classes.get_mut(class).ok_or(PrivilegeError::UnknownClass(class))?;
        Ok(c.data.replace(value))
    }
}
