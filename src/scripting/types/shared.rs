//! Argument conversion and manager access shared by all privilege handle types.
//!
//! Script code may name an object by handle, integer id or tag string. These
//! helpers turn any of those into an id of the right manager and run the
//! operation against the registry stored in the Lua state.

use mlua::{AnyUserData, Lua, RegistryKey, UserData, Value};

use std::any::Any;

use crate::privilege::{Decision, Manager, ManagerId, PrivilegeError, UserSlot};
use crate::scripting::privileges;

/// Handle userdata that points into one manager.
pub trait Handle: UserData + Copy + 'static {
    const KIND: &'static str;
    fn manager(&self) -> ManagerId;
    fn id(&self) -> i64;
}

/// An object reference as passed from script code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectArg {
    Id(i64),
    Tag(String),
}

fn bad_argument(kind: &str, got: &Value) -> mlua::Error {
    mlua::Error::RuntimeError(format!(
        "expected privilege {kind} (handle, id or tag), got {}",
        got.type_name()
    ))
}

/// Borrow a handle of type `T` out of userdata, checking it belongs to `manager`.
pub fn handle_of<T: Handle>(manager: ManagerId, ud: &AnyUserData) -> mlua::Result<T> {
    let handle = *ud.borrow::<T>()?;
    if handle.manager() != manager {
        return Err(mlua::Error::RuntimeError(format!(
            "privilege {} {} belongs to manager {}, not {}",
            T::KIND,
            handle.id(),
            handle.manager(),
            manager
        )));
    }
    Ok(handle)
}

/// Whole number that converts to an `i64` without clamping.
fn is_integral_id(f: f64) -> bool {
    // i64::MAX as f64 rounds up to 2^63, which is already out of range
    f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64
}

/// Convert a script value naming a `T` into an [`ObjectArg`].
pub fn object_arg<T: Handle>(manager: ManagerId, v: &Value) -> mlua::Result<ObjectArg> {
    match v {
        Value::Integer(i) => Ok(ObjectArg::Id(*i)),
        Value::Number(f) if is_integral_id(*f) => Ok(ObjectArg::Id(*f as i64)),
        Value::String(s) => Ok(ObjectArg::Tag((*s.to_str()?).to_owned())),
        Value::UserData(ud) => handle_of::<T>(manager, ud).map(|h| ObjectArg::Id(h.id())),
        other => Err(bad_argument(T::KIND, other)),
    }
}

fn unknown_tag(kind: &str, tag: &str) -> mlua::Error {
    mlua::Error::RuntimeError(format!("unknown privilege {kind} tag: {tag}"))
}

pub fn entry_id(m: &Manager, arg: &ObjectArg) -> mlua::Result<i64> {
    match arg {
        ObjectArg::Id(id) => Ok(*id),
        ObjectArg::Tag(tag) => m
            .entry_by_tag(tag)
            .map_err(mlua::Error::external)?
            .map(|e| e.id())
            .ok_or_else(|| unknown_tag("entry", tag)),
    }
}

pub fn class_id(m: &Manager, arg: &ObjectArg) -> mlua::Result<i64> {
    match arg {
        ObjectArg::Id(id) => Ok(*id),
        ObjectArg::Tag(tag) => m
            .class_by_tag(tag)
            .map_err(mlua::Error::external)?
            .map(|c| c.id())
            .ok_or_else(|| unknown_tag("class", tag)),
    }
}

pub fn unit_id(m: &Manager, arg: &ObjectArg) -> mlua::Result<i64> {
    match arg {
        ObjectArg::Id(id) => Ok(*id),
        ObjectArg::Tag(tag) => m
            .unit_by_tag(tag)
            .map_err(mlua::Error::external)?
            .map(|u| u.id())
            .ok_or_else(|| unknown_tag("unit", tag)),
    }
}

/// `PV_ALLOW`/`PV_DENY`/`PV_INHERIT`, a boolean, a decision name, or nil (inherit).
pub fn decision_arg(v: &Value) -> mlua::Result<Decision> {
    let decision = match v {
        Value::Nil => Some(Decision::Inherit),
        Value::Boolean(b) => Some(Decision::from(*b)),
        Value::Integer(i) => Decision::from_int(*i),
        Value::String(s) => match &*s.to_str()? {
            "allow" => Some(Decision::Allow),
            "deny" => Some(Decision::Deny),
            "inherit" => Some(Decision::Inherit),
            _ => None,
        },
        _ => None,
    };
    decision.ok_or_else(|| {
        mlua::Error::RuntimeError(format!("invalid privilege decision: {}", v.type_name()))
    })
}

/// Read a script value out of a unit or class data slot.
pub fn slot_value(lua: &Lua, slot: &UserSlot) -> mlua::Result<Value> {
    match slot.get::<RegistryKey>() {
        Some(key) => lua.registry_value(key),
        None => Ok(Value::Nil),
    }
}

/// Pin a script value in the Lua registry so it can live in a data slot.
/// `nil` empties the slot.
pub fn store_slot(lua: &Lua, value: Value) -> mlua::Result<Option<Box<dyn Any>>> {
    if value.is_nil() {
        return Ok(None);
    }
    let key = lua.create_registry_value(value)?;
    Ok(Some(Box::new(key)))
}

/// Run `f` against manager `id` with shared access.
pub fn with_manager<R>(
    lua: &Lua,
    id: ManagerId,
    f: impl FnOnce(&Manager) -> mlua::Result<R>,
) -> mlua::Result<R> {
    let pv = privileges(lua)?;
    let pv = pv.borrow();
    let m = pv.manager(id).map_err(mlua::Error::external)?;
    f(m)
}

/// Run `f` against manager `id` with exclusive access.
pub fn with_manager_mut<R>(
    lua: &Lua,
    id: ManagerId,
    f: impl FnOnce(&mut Manager) -> mlua::Result<R>,
) -> mlua::Result<R> {
    let pv = privileges(lua)?;
    let mut pv = pv.borrow_mut();
    let m = pv.manager_mut(id).map_err(mlua::Error::external)?;
    f(m)
}

/// Map a core error into a script error.
pub fn lua_err(e: PrivilegeError) -> mlua::Error {
    mlua::Error::external(e)
}
