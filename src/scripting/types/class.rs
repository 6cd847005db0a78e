use mlua::{MetaMethod, UserData, UserDataFields, UserDataMethods, Value};

use crate::privilege::{Decision, ManagerId};
use crate::scripting::types::entry::EntryObject;
use crate::scripting::types::manager::ManagerObject;
use crate::scripting::types::shared::{
    class_id, decision_arg, entry_id, lua_err, object_arg, slot_value, store_slot, unit_id,
    with_manager, with_manager_mut, Handle,
};
use crate::scripting::types::unit::UnitObject;

/// Script handle for a privilege class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassObject {
    pub manager: ManagerId,
    pub id: i64,
}

impl Handle for ClassObject {
    const KIND: &'static str = "class";

    fn manager(&self) -> ManagerId {
        self.manager
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl ClassObject {
    fn set_decision(&self, lua: &mlua::Lua, entry: &Value, decision: Decision) -> mlua::Result<i64> {
        let entry = object_arg::<EntryObject>(self.manager, entry)?;
        with_manager_mut(lua, self.manager, |m| {
            let entry = entry_id(m, &entry)?;
            let prev = m.set_class_decision(self.id, entry, decision).map_err(lua_err)?;
            Ok(prev.as_int())
        })
    }
}

impl UserData for ClassObject {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("id", |_, this| Ok(this.id));
        fields.add_field_method_get("manager", |_, this| Ok(ManagerObject { id: this.manager }));

        fields.add_field_method_get("tag", |lua, this| {
            with_manager(lua, this.manager, |m| Ok(m.class(this.id).map(|c| c.tag().to_owned())))
        });
        fields.add_field_method_set("tag", |lua, this, tag: String| {
            with_manager_mut(lua, this.manager, |m| m.set_class_tag(this.id, &tag).map_err(lua_err))
        });

        fields.add_field_method_get("parent", |lua, this| {
            with_manager(lua, this.manager, |m| {
                let parent = m.class(this.id).and_then(|c| c.parent());
                Ok(parent.map(|id| ClassObject { manager: this.manager, id }))
            })
        });
        fields.add_field_method_set("parent", |lua, this, parent: Value| {
            let parent = match parent {
                Value::Nil => None,
                v => Some(object_arg::<ClassObject>(this.manager, &v)?),
            };
            with_manager_mut(lua, this.manager, |m| {
                let parent = parent.map(|p| class_id(m, &p)).transpose()?;
                m.set_class_parent(this.id, parent).map_err(lua_err)
            })
        });

        fields.add_field_method_get("unitCount", |lua, this| {
            with_manager(lua, this.manager, |m| Ok(m.class(this.id).map_or(0, |c| c.unit_count())))
        });

        fields.add_field_method_get("data", |lua, this| {
            with_manager(lua, this.manager, |m| match m.class(this.id) {
                Some(c) => slot_value(lua, c.data()),
                None => Ok(Value::Nil),
            })
        });
        fields.add_field_method_set("data", |lua, this, value: Value| {
            let value = store_slot(lua, value)?;
            with_manager_mut(lua, this.manager, |m| {
                m.set_class_data(this.id, value).map_err(lua_err)?;
                Ok(())
            })
        });
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("getManager", |_, this, ()| Ok(ManagerObject { id: this.manager }));

        // ── Roster ──────────────────────────────────────────────────────────
        methods.add_method("getUnitByID", |lua, this, id: i64| {
            with_manager(lua, this.manager, |m| {
                Ok(m.class_unit_by_id(this.id, id).map(|u| UnitObject { manager: this.manager, id: u.id() }))
            })
        });
        methods.add_method("getUnitByTag", |lua, this, tag: String| {
            with_manager(lua, this.manager, |m| {
                let unit = m.class_unit_by_tag(this.id, &tag).map_err(lua_err)?;
                Ok(unit.map(|u| UnitObject { manager: this.manager, id: u.id() }))
            })
        });
        methods.add_method("createUnit", |lua, this, (id, tag): (i64, String)| {
            with_manager_mut(lua, this.manager, |m| {
                let unit = m.create_unit(id, this.id, &tag).map_err(lua_err)?;
                Ok(UnitObject { manager: this.manager, id: unit.id() })
            })
        });
        methods.add_method("addUnit", |lua, this, unit: Value| {
            let unit = object_arg::<UnitObject>(this.manager, &unit)?;
            with_manager_mut(lua, this.manager, |m| {
                let unit = unit_id(m, &unit)?;
                m.add_unit(this.id, unit).map_err(lua_err)
            })
        });
        methods.add_method("units", |lua, this, ()| {
            let ids: Vec<i64> = with_manager(lua, this.manager, |m| {
                Ok(m.class(this.id).map(|c| c.units().collect()).unwrap_or_default())
            })?;
            lua.create_sequence_from(ids.into_iter().map(|id| UnitObject { manager: this.manager, id }))
        });

        // ── Permissions ─────────────────────────────────────────────────────
        methods.add_method("allow", |lua, this, entry: Value| this.set_decision(lua, &entry, Decision::Allow));
        methods.add_method("deny", |lua, this, entry: Value| this.set_decision(lua, &entry, Decision::Deny));
        methods.add_method("inherit", |lua, this, entry: Value| {
            this.set_decision(lua, &entry, Decision::Inherit)
        });
        methods.add_method("setDecision", |lua, this, (entry, decision): (Value, Value)| {
            let decision = decision_arg(&decision)?;
            this.set_decision(lua, &entry, decision)
        });
        methods.add_method("decision", |lua, this, entry: Value| {
            let entry = object_arg::<EntryObject>(this.manager, &entry)?;
            with_manager(lua, this.manager, |m| {
                let entry = entry_id(m, &entry)?;
                Ok(m.class(this.id).map_or(Decision::Inherit, |c| c.permissions().get(entry)).as_int())
            })
        });

        methods.add_method("setParent", |lua, this, parent: Value| {
            let parent = match parent {
                Value::Nil => None,
                v => Some(object_arg::<ClassObject>(this.manager, &v)?),
            };
            with_manager_mut(lua, this.manager, |m| {
                let parent = parent.map(|p| class_id(m, &p)).transpose()?;
                m.set_class_parent(this.id, parent).map_err(lua_err)
            })
        });
        methods.add_method("release", |lua, this, ()| {
            with_manager_mut(lua, this.manager, |m| m.release_class(this.id).map_err(lua_err))
        });

        methods.add_meta_method(MetaMethod::Eq, |_, this, other: mlua::AnyUserData| {
            Ok(other.borrow::<Self>().map(|o| *o == *this).unwrap_or(false))
        });
        methods.add_meta_method(MetaMethod::ToString, |lua, this, ()| {
            let tag = with_manager(lua, this.manager, |m| Ok(m.class(this.id).map(|c| c.tag().to_owned())))
                .ok()
                .flatten()
                .unwrap_or_else(|| "?".to_string());
            Ok(format!("PvClass({}: {tag})", this.id))
        });
    }
}
