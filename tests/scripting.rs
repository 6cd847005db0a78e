use mlua::Lua;
use pvacl::config::PrivilegeSeed;
use pvacl::scripting::{self, SharedPrivileges};

fn start_lua() -> (Lua, SharedPrivileges) {
    let lua = Lua::new();
    let shared = scripting::register(&lua).unwrap();
    (lua, shared)
}

fn run(lua: &Lua, src: &str) {
    if let Err(e) = lua.load(src).exec() {
        panic!("script failed: {e}");
    }
}

fn error_of(lua: &Lua, src: &str) -> String {
    match lua.load(src).exec() {
        Ok(()) => panic!("script should have failed"),
        Err(e) => e.to_string(),
    }
}

const SETUP: &str = r#"
    m = PvManager("server")
    kick = m:createEntry(5, "can_kick")
    chat = m:createEntry(6, "can_chat")
    player = m:createClass(1, "player")
    admin = m:createClass(2, "admin")
    admin:allow(kick)
    player:allow("can_chat")
    alice = m:createUnit(100, admin, "alice")
    bob = m:createUnit(101, "player", "bob")
"#;

#[test]
fn test_class_grants_reach_units() {
    let (lua, _pv) = start_lua();
    run(&lua, SETUP);
    run(&lua, r#"
        assert(alice:can(kick) == true)
        assert(bob:can(kick) == false)
        assert(bob:can("can_chat") == true)
        assert(bob:can(6) == true)
    "#);
}

#[test]
fn test_unit_decision_beats_class() {
    let (lua, _pv) = start_lua();
    run(&lua, SETUP);
    run(&lua, r#"
        assert(alice:deny(kick) == PV_INHERIT)
        assert(alice:can(kick) == false)
        assert(alice:inherit(kick) == PV_DENY)
        assert(alice:can(kick) == true)
        assert(alice:decision(kick) == PV_INHERIT)
    "#);
}

#[test]
fn test_create_is_idempotent() {
    let (lua, pv) = start_lua();
    run(&lua, SETUP);
    run(&lua, r#"
        local again = m:createEntry(5, "something_else")
        assert(again == kick)
        assert(again.tag == "can_kick")

        local bob2 = m:createUnit(101, admin, "robert")
        assert(bob2 == bob)
        assert(bob2.class == player)
        assert(m.unitCount == 2)
    "#);
    let pv = pv.borrow();
    let m = pv.manager_by_name("server").unwrap();
    assert_eq!(m.entry_count(), 2);
    assert_eq!(m.unit(101).unwrap().tag(), "bob");
}

#[test]
fn test_unit_lives_in_one_class() {
    let (lua, pv) = start_lua();
    run(&lua, SETUP);
    run(&lua, r#"
        assert(admin:addUnit(bob) == true)
        assert(admin:addUnit(bob) == false)
        assert(bob.class == admin)
        assert(player:getUnitByID(101) == nil)
        assert(admin:getUnitByTag("bob") == bob)
        assert(bob:can(kick))

        bob:setClass("player")
        assert(#player:units() == 1)
        assert(#admin:units() == 1)
        assert(admin:units()[1] == alice)
    "#);
    let pv = pv.borrow();
    let m = pv.manager_by_name("server").unwrap();
    for class in m.classes() {
        for unit in class.units() {
            assert_eq!(m.unit(unit).unwrap().class_id(), class.id());
        }
    }
}

#[test]
fn test_tag_lookup_compares_whole_tag() {
    let (lua, _pv) = start_lua();
    run(&lua, r#"
        local m = PvManager()
        m:createEntry(1, "ab")
        m:createEntry(2, "abc")
        assert(m:getEntryByTag("ab").id == 1)
        assert(m:getEntryByTag("abc").id == 2)
        assert(m:getEntryByTag("a") == nil)
        assert(m:getEntryByTag("abcd") == nil)
    "#);
}

#[test]
fn test_empty_tag_is_rejected() {
    let (lua, _pv) = start_lua();
    run(&lua, SETUP);
    let err = error_of(&lua, r#"m:createUnit(102, admin, "")"#);
    assert!(err.contains("invalid or empty privilege unit name"), "{err}");
    run(&lua, r#"
        local ok = pcall(function() return m:getClassByTag("") end)
        assert(not ok)
        assert(m.unitCount == 2)
    "#);
}

#[test]
fn test_unknown_references_error() {
    let (lua, _pv) = start_lua();
    run(&lua, SETUP);
    let err = error_of(&lua, r#"alice:can("can_fly")"#);
    assert!(err.contains("unknown privilege entry tag: can_fly"), "{err}");
    let err = error_of(&lua, "alice:can(99)");
    assert!(err.contains("unknown privilege entry: 99"), "{err}");
    let err = error_of(&lua, r#"m:createUnit(200, 42, "ghost")"#);
    assert!(err.contains("unknown privilege class: 42"), "{err}");
}

#[test]
fn test_actor_against_target() {
    let (lua, _pv) = start_lua();
    run(&lua, SETUP);
    run(&lua, r#"
        local carol = m:createUnit(102, admin, "carol")

        -- nothing on the target: actor's own answer
        assert(carol:can(kick, alice) == true)
        assert(alice:can(kick, bob) == false)

        -- admins may not kick carol
        carol:override(admin, kick, PV_DENY)
        assert(carol:can(kick, alice) == false)

        -- but alice specifically may
        assert(carol:override(alice, kick, "allow") == PV_INHERIT)
        assert(carol:can(kick, alice) == true)

        -- and bob may, though his class cannot
        carol:override(bob, kick, true)
        assert(carol:can(kick, bob) == true)
        assert(bob:can(kick) == false)
    "#);
}

#[test]
fn test_class_parent_chain() {
    let (lua, _pv) = start_lua();
    run(&lua, SETUP);
    run(&lua, r#"
        admin.parent = player
        assert(admin.parent == player)
        assert(alice:can(chat))

        admin:deny(chat)
        assert(not alice:can(chat))
        admin:inherit(chat)

        admin:setParent(nil)
        assert(admin.parent == nil)
        assert(not alice:can(chat))
    "#);
    let err = error_of(&lua, "admin.parent = player; player:setParent(admin)");
    assert!(err.contains("inheritance cycle"), "{err}");
}

#[test]
fn test_release_objects() {
    let (lua, pv) = start_lua();
    run(&lua, SETUP);
    let err = error_of(&lua, "admin:release()");
    assert!(err.contains("class 2 is still in use"), "{err}");
    run(&lua, r#"
        alice:release()
        assert(m:getUnitByID(100) == nil)
        assert(#admin:units() == 0)
        admin:release()
        assert(m:getClassByTag("admin") == nil)
    "#);
    assert_eq!(pv.borrow().manager_by_name("server").unwrap().class_count(), 1);
}

#[test]
fn test_data_slot_holds_lua_values() {
    let (lua, _pv) = start_lua();
    run(&lua, SETUP);
    run(&lua, r#"
        assert(alice.data == nil)
        alice.data = { level = 99, name = "Alice" }
        assert(alice.data.level == 99)

        local same = m:getUnitByTag("alice")
        assert(same.data.name == "Alice")

        admin.data = "staff"
        assert(admin.data == "staff")

        alice.data = nil
        assert(alice.data == nil)
    "#);
}

#[test]
fn test_entry_fields() {
    let (lua, _pv) = start_lua();
    run(&lua, SETUP);
    run(&lua, r#"
        assert(kick.brief == "")
        kick.brief = "Remove a player from the map"
        assert(m:getEntryByID(5).brief == "Remove a player from the map")

        kick.tag = "kick"
        assert(m:getEntryByTag("kick") == kick)
        assert(m:getEntryByTag("can_kick") == nil)
        assert(tostring(kick) == "PvEntry(5: kick)")
        assert(kick:getManager() == m)
    "#);
}

#[test]
fn test_tostring_handles() {
    let (lua, _pv) = start_lua();
    run(&lua, SETUP);
    let shown: String = lua
        .load("return tostring(alice) .. ' ' .. tostring(admin) .. ' ' .. tostring(m)")
        .eval()
        .unwrap();
    assert_eq!(shown, "PvUnit(100: alice) PvClass(2: admin) PvManager(#1: server)");
}

#[test]
fn test_handles_from_other_manager_rejected() {
    let (lua, _pv) = start_lua();
    run(&lua, SETUP);
    let err = error_of(&lua, r#"
        local other = PvManager("other")
        other:createUnit(1, admin, "mallory")
    "#);
    assert!(err.contains("belongs to manager"), "{err}");
}

#[test]
fn test_managers_are_isolated() {
    let (lua, _pv) = start_lua();
    run(&lua, SETUP);
    run(&lua, r#"
        local other = PvManager("other")
        assert(other:getEntryByID(5) == nil)
        other:createEntry(5, "unrelated")
        assert(m:getEntryByID(5).tag == "can_kick")

        local all = PvManagers()
        assert(all.server == m)
        assert(all.other == other)
    "#);
}

#[test]
fn test_terminate_kills_handles() {
    let (lua, pv) = start_lua();
    run(&lua, SETUP);
    let released: usize = lua.load("return TerminatePrivileges()").eval().unwrap();
    assert_eq!(released, 1);
    assert!(pv.borrow().is_empty());

    let err = error_of(&lua, "alice:can(kick)");
    assert!(err.contains("no longer exists"), "{err}");
    run(&lua, r#"
        assert(tostring(m) == "PvManager(#1: released)")
        assert(m:release() == false)

        local fresh = PvManager("server")
        assert(fresh ~= m)
        assert(fresh:getUnitByID(100) == nil)
    "#);
}

#[test]
fn test_seeded_managers_visible_to_scripts() {
    let seed = PrivilegeSeed::from_yaml_str(
        r#"
managers:
  - name: server
    entries:
      - { id: 1, tag: chat }
      - { id: 2, tag: kick }
    classes:
      - { id: 1, tag: player, allow: [chat] }
      - { id: 2, tag: moderator, parent: player, allow: [kick] }
    units:
      - { id: 100, tag: alice, class: moderator }
"#,
    )
    .unwrap();

    let (lua, pv) = start_lua();
    seed.apply(&mut pv.borrow_mut()).unwrap();
    run(&lua, r#"
        local m = PvManagers().server
        local alice = m:getUnitByTag("alice")
        assert(alice:can("chat"))
        assert(alice:can("kick"))
        assert(alice.class.parent.tag == "player")
    "#);
}

#[test]
fn test_out_of_range_float_id_rejected() {
    let (lua, pv) = start_lua();
    run(&lua, r#"
        m = PvManager("server")
        m:createClass(9223372036854775807, "top")
        m:createClass(3, "three")
    "#);
    let err = error_of(&lua, r#"m:createUnit(1, 1e30, "u")"#);
    assert!(err.contains("expected privilege class"), "{err}");
    let err = error_of(&lua, r#"m:createUnit(1, -1e30, "u")"#);
    assert!(err.contains("expected privilege class"), "{err}");
    assert_eq!(pv.borrow().manager_by_name("server").unwrap().unit_count(), 0);

    // whole floats in range still name an id
    run(&lua, r#"assert(m:createUnit(1, 3.0, "u").class.id == 3)"#);
}

#[test]
fn test_shared_manager_name_resolves_to_first() {
    let (lua, pv) = start_lua();
    let id: u32 = lua
        .load(r#"
            local first = PvManager("x")
            PvManager("x")
            assert(PvManagers()["x"] == first)
            return PvManagers()["x"].id
        "#)
        .eval()
        .unwrap();
    assert_eq!(pv.borrow().manager_by_name("x").unwrap().id().get(), id);
    assert_eq!(id, 1);
}
