//! Privilege globals registered on the Lua state.

use mlua::Lua;

use crate::privilege::Decision;
use crate::scripting::types::ManagerObject;
use crate::scripting::{privileges, terminate_privileges};

pub fn register(lua: &Lua) -> mlua::Result<()> {
    let g = lua.globals();

    // -----------------------------------------------------------------------
    // Decision constants — used by setDecision / override
    // -----------------------------------------------------------------------
    g.set("PV_ALLOW", Decision::Allow.as_int())?;
    g.set("PV_DENY", Decision::Deny.as_int())?;
    g.set("PV_INHERIT", Decision::Inherit.as_int())?;

    // -----------------------------------------------------------------------
    // Managers
    // -----------------------------------------------------------------------
    g.set("PvManager", lua.create_function(|lua, name: Option<String>| {
        let id = privileges(lua)?
            .borrow_mut()
            .create_manager(name.as_deref().unwrap_or(""));
        Ok(ManagerObject { id })
    })?)?;

    g.set("PvManagers", lua.create_function(|lua, ()| {
        let managers: Vec<(String, ManagerObject)> = privileges(lua)?
            .borrow()
            .iter()
            .map(|m| (m.name().to_owned(), ManagerObject { id: m.id() }))
            .collect();
        // lowest id wins a shared name, same as Privileges::manager_by_name
        let table = lua.create_table()?;
        for (name, manager) in managers {
            if !table.contains_key(name.as_str())? {
                table.set(name, manager)?;
            }
        }
        Ok(table)
    })?)?;

    g.set("TerminatePrivileges", lua.create_function(|lua, ()| terminate_privileges(lua))?)?;

    Ok(())
}
