use mlua::{MetaMethod, UserData, UserDataFields, UserDataMethods, Value};

use crate::privilege::ManagerId;
use crate::scripting::privileges;
use crate::scripting::types::class::ClassObject;
use crate::scripting::types::entry::EntryObject;
use crate::scripting::types::shared::{
    class_id, lua_err, object_arg, with_manager, with_manager_mut,
};
use crate::scripting::types::unit::UnitObject;

/// Script handle for a privilege manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerObject {
    pub id: ManagerId,
}

impl UserData for ManagerObject {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("id", |_, this| Ok(this.id.get()));
        fields.add_field_method_get("name", |lua, this| {
            with_manager(lua, this.id, |m| Ok(m.name().to_owned()))
        });
        fields.add_field_method_get("entryCount", |lua, this| {
            with_manager(lua, this.id, |m| Ok(m.entry_count()))
        });
        fields.add_field_method_get("classCount", |lua, this| {
            with_manager(lua, this.id, |m| Ok(m.class_count()))
        });
        fields.add_field_method_get("unitCount", |lua, this| {
            with_manager(lua, this.id, |m| Ok(m.unit_count()))
        });
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        // ── Entries ─────────────────────────────────────────────────────────
        methods.add_method("getEntryByID", |lua, this, id: i64| {
            with_manager(lua, this.id, |m| {
                Ok(m.entry(id).map(|e| EntryObject { manager: this.id, id: e.id() }))
            })
        });
        methods.add_method("getEntryByTag", |lua, this, tag: String| {
            with_manager(lua, this.id, |m| {
                let entry = m.entry_by_tag(&tag).map_err(lua_err)?;
                Ok(entry.map(|e| EntryObject { manager: this.id, id: e.id() }))
            })
        });
        methods.add_method("createEntry", |lua, this, (id, tag): (i64, String)| {
            with_manager_mut(lua, this.id, |m| {
                let entry = m.create_entry(id, &tag).map_err(lua_err)?;
                Ok(EntryObject { manager: this.id, id: entry.id() })
            })
        });

        // ── Classes ─────────────────────────────────────────────────────────
        methods.add_method("getClassByID", |lua, this, id: i64| {
            with_manager(lua, this.id, |m| {
                Ok(m.class(id).map(|c| ClassObject { manager: this.id, id: c.id() }))
            })
        });
        methods.add_method("getClassByTag", |lua, this, tag: String| {
            with_manager(lua, this.id, |m| {
                let class = m.class_by_tag(&tag).map_err(lua_err)?;
                Ok(class.map(|c| ClassObject { manager: this.id, id: c.id() }))
            })
        });
        methods.add_method("createClass", |lua, this, (id, tag): (i64, String)| {
            with_manager_mut(lua, this.id, |m| {
                let class = m.create_class(id, &tag).map_err(lua_err)?;
                Ok(ClassObject { manager: this.id, id: class.id() })
            })
        });

        // ── Units ───────────────────────────────────────────────────────────
        methods.add_method("getUnitByID", |lua, this, id: i64| {
            with_manager(lua, this.id, |m| {
                Ok(m.unit(id).map(|u| UnitObject { manager: this.id, id: u.id() }))
            })
        });
        methods.add_method("getUnitByTag", |lua, this, tag: String| {
            with_manager(lua, this.id, |m| {
                let unit = m.unit_by_tag(&tag).map_err(lua_err)?;
                Ok(unit.map(|u| UnitObject { manager: this.id, id: u.id() }))
            })
        });
        methods.add_method("createUnit", |lua, this, (id, class, tag): (i64, Value, String)| {
            let class = object_arg::<ClassObject>(this.id, &class)?;
            with_manager_mut(lua, this.id, |m| {
                let class = class_id(m, &class)?;
                let unit = m.create_unit(id, class, &tag).map_err(lua_err)?;
                Ok(UnitObject { manager: this.id, id: unit.id() })
            })
        });

        // Drops the manager and everything in it; other handles stop working.
        methods.add_method("release", |lua, this, ()| {
            Ok(privileges(lua)?.borrow_mut().release_manager(this.id))
        });

        methods.add_meta_method(MetaMethod::Eq, |_, this, other: mlua::AnyUserData| {
            Ok(other.borrow::<Self>().map(|o| *o == *this).unwrap_or(false))
        });
        methods.add_meta_method(MetaMethod::ToString, |lua, this, ()| {
            let name = with_manager(lua, this.id, |m| Ok(m.name().to_owned()))
                .unwrap_or_else(|_| "released".to_string());
            Ok(format!("PvManager({}: {name})", this.id))
        });
    }
}
