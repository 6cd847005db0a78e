use mlua::{MetaMethod, UserData, UserDataFields, UserDataMethods};

use crate::privilege::ManagerId;
use crate::scripting::types::manager::ManagerObject;
use crate::scripting::types::shared::{lua_err, with_manager, with_manager_mut, Handle};

/// Script handle for a permission entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryObject {
    pub manager: ManagerId,
    pub id: i64,
}

impl Handle for EntryObject {
    const KIND: &'static str = "entry";

    fn manager(&self) -> ManagerId {
        self.manager
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl UserData for EntryObject {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("id", |_, this| Ok(this.id));
        fields.add_field_method_get("manager", |_, this| Ok(ManagerObject { id: this.manager }));

        fields.add_field_method_get("tag", |lua, this| {
            with_manager(lua, this.manager, |m| Ok(m.entry(this.id).map(|e| e.tag().to_owned())))
        });
        fields.add_field_method_set("tag", |lua, this, tag: String| {
            with_manager_mut(lua, this.manager, |m| m.set_entry_tag(this.id, &tag).map_err(lua_err))
        });

        fields.add_field_method_get("brief", |lua, this| {
            with_manager(lua, this.manager, |m| Ok(m.entry(this.id).map(|e| e.brief().to_owned())))
        });
        fields.add_field_method_set("brief", |lua, this, brief: String| {
            with_manager_mut(lua, this.manager, |m| m.set_entry_brief(this.id, &brief).map_err(lua_err))
        });
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("getManager", |_, this, ()| Ok(ManagerObject { id: this.manager }));

        methods.add_meta_method(MetaMethod::Eq, |_, this, other: mlua::AnyUserData| {
            Ok(other.borrow::<Self>().map(|o| *o == *this).unwrap_or(false))
        });
        methods.add_meta_method(MetaMethod::ToString, |lua, this, ()| {
            let tag = with_manager(lua, this.manager, |m| Ok(m.entry(this.id).map(|e| e.tag().to_owned())))
                .ok()
                .flatten()
                .unwrap_or_else(|| "?".to_string());
            Ok(format!("PvEntry({}: {tag})", this.id))
        });
    }
}
