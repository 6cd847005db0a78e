use mlua::{AnyUserData, MetaMethod, UserData, UserDataFields, UserDataMethods, Value};

use crate::privilege::{Decision, ManagerId, Subject};
use crate::scripting::types::class::ClassObject;
use crate::scripting::types::entry::EntryObject;
use crate::scripting::types::manager::ManagerObject;
use crate::scripting::types::shared::{
    class_id, decision_arg, entry_id, handle_of, lua_err, object_arg, slot_value, store_slot,
    unit_id, with_manager, with_manager_mut, Handle,
};

/// Script handle for a privilege unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitObject {
    pub manager: ManagerId,
    pub id: i64,
}

impl Handle for UnitObject {
    const KIND: &'static str = "unit";

    fn manager(&self) -> ManagerId {
        self.manager
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl UnitObject {
    fn set_decision(&self, lua: &mlua::Lua, entry: &Value, decision: Decision) -> mlua::Result<i64> {
        let entry = object_arg::<EntryObject>(self.manager, entry)?;
        with_manager_mut(lua, self.manager, |m| {
            let entry = entry_id(m, &entry)?;
            let prev = m.set_unit_decision(self.id, entry, decision).map_err(lua_err)?;
            Ok(prev.as_int())
        })
    }

    fn subject(&self, ud: &AnyUserData) -> mlua::Result<Subject> {
        if ud.is::<UnitObject>() {
            Ok(Subject::Unit(handle_of::<UnitObject>(self.manager, ud)?.id))
        } else if ud.is::<ClassObject>() {
            Ok(Subject::Class(handle_of::<ClassObject>(self.manager, ud)?.id))
        } else {
            Err(mlua::Error::RuntimeError(
                "override subject must be a privilege unit or class".to_string(),
            ))
        }
    }
}

impl UserData for UnitObject {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("id", |_, this| Ok(this.id));
        fields.add_field_method_get("manager", |_, this| Ok(ManagerObject { id: this.manager }));

        fields.add_field_method_get("tag", |lua, this| {
            with_manager(lua, this.manager, |m| Ok(m.unit(this.id).map(|u| u.tag().to_owned())))
        });
        fields.add_field_method_set("tag", |lua, this, tag: String| {
            with_manager_mut(lua, this.manager, |m| m.set_unit_tag(this.id, &tag).map_err(lua_err))
        });

        fields.add_field_method_get("class", |lua, this| {
            with_manager(lua, this.manager, |m| {
                Ok(m.unit(this.id).map(|u| ClassObject { manager: this.manager, id: u.class_id() }))
            })
        });
        fields.add_field_method_set("class", |lua, this, class: Value| {
            let class = object_arg::<ClassObject>(this.manager, &class)?;
            with_manager_mut(lua, this.manager, |m| {
                let class = class_id(m, &class)?;
                m.set_unit_class(this.id, class).map_err(lua_err)?;
                Ok(())
            })
        });

        fields.add_field_method_get("data", |lua, this| {
            with_manager(lua, this.manager, |m| match m.unit(this.id) {
                Some(u) => slot_value(lua, u.data()),
                None => Ok(Value::Nil),
            })
        });
        fields.add_field_method_set("data", |lua, this, value: Value| {
            let value = store_slot(lua, value)?;
            with_manager_mut(lua, this.manager, |m| {
                m.set_unit_data(this.id, value).map_err(lua_err)?;
                Ok(())
            })
        });
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("getManager", |_, this, ()| Ok(ManagerObject { id: this.manager }));
        methods.add_method("getClass", |lua, this, ()| {
            with_manager(lua, this.manager, |m| {
                Ok(m.unit(this.id).map(|u| ClassObject { manager: this.manager, id: u.class_id() }))
            })
        });
        methods.add_method("setClass", |lua, this, class: Value| {
            let class = object_arg::<ClassObject>(this.manager, &class)?;
            with_manager_mut(lua, this.manager, |m| {
                let class = class_id(m, &class)?;
                m.set_unit_class(this.id, class).map_err(lua_err)
            })
        });

        // unit:can(entry) or unit:can(entry, actor)
        methods.add_method("can", |lua, this, (entry, actor): (Value, Option<Value>)| {
            let entry = object_arg::<EntryObject>(this.manager, &entry)?;
            let actor = match actor {
                None | Some(Value::Nil) => None,
                Some(v) => Some(object_arg::<UnitObject>(this.manager, &v)?),
            };
            with_manager(lua, this.manager, |m| {
                let entry = entry_id(m, &entry)?;
                let allowed = match actor {
                    Some(actor) => m.can_against(this.id, entry, unit_id(m, &actor)?),
                    None => m.can(this.id, entry),
                };
                allowed.map_err(lua_err)
            })
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
                Ok(m.unit(this.id).map_or(Decision::Inherit, |u| u.permissions().get(entry)).as_int())
            })
        });
        methods.add_method(
            "override",
            |lua, this, (subject, entry, decision): (AnyUserData, Value, Value)| {
                let subject = this.subject(&subject)?;
                let entry = object_arg::<EntryObject>(this.manager, &entry)?;
                let decision = decision_arg(&decision)?;
                with_manager_mut(lua, this.manager, |m| {
                    let entry = entry_id(m, &entry)?;
                    let prev = m.set_unit_override(this.id, subject, entry, decision).map_err(lua_err)?;
                    Ok(prev.as_int())
                })
            },
        );

        methods.add_method("release", |lua, this, ()| {
            with_manager_mut(lua, this.manager, |m| m.release_unit(this.id).map_err(lua_err))
        });

        methods.add_meta_method(MetaMethod::Eq, |_, this, other: AnyUserData| {
            Ok(other.borrow::<Self>().map(|o| *o == *this).unwrap_or(false))
        });
        methods.add_meta_method(MetaMethod::ToString, |lua, this, ()| {
            let tag = with_manager(lua, this.manager, |m| Ok(m.unit(this.id).map(|u| u.tag().to_owned())))
                .ok()
                .flatten()
                .unwrap_or_else(|| "?".to_string());
            Ok(format!("PvUnit({}: {tag})", this.id))
        });
    }
}
