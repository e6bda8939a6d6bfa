//! Function Proxy Integration Tests
//!
//! Host code calling guest closures through proxies, release semantics and
//! reentrant calls across the boundary.

use bridge::{Bridge, ProxyId};
use guest_runtime::{GuestError, GuestState, GuestValue};
use host_types::HostValue;
use integration_tests::fixtures::{multiplier, new_bridge, table_with_meta};

/// Test: doubling closure called from the host
#[test]
fn test_proxy_doubles_argument() {
    let (_state, bridge) = new_bridge();
    let f = bridge.wrap(&multiplier(2.0));

    let out = f.call(HostValue::Undefined, vec![HostValue::number(21.0)]).unwrap();
    assert_eq!(out, HostValue::number(42.0));
}

/// Test: guest closures inside converted tables become proxies
#[test]
fn test_function_field_becomes_proxy() {
    let (_state, bridge) = new_bridge();
    let table = guest_runtime::Table::new();
    table.raw_set_str("triple", multiplier(3.0));

    let host = bridge.to_host(&GuestValue::Table(table));
    let triple = host.get("triple");
    assert!(triple.is_function());
    let out = triple.call(HostValue::Undefined, vec![HostValue::number(5.0)]).unwrap();
    assert_eq!(out, HostValue::number(15.0));
    assert_eq!(bridge.live_proxies(), 1);
}

/// Test: callable tables cross as functions
#[test]
fn test_callable_table_becomes_proxy() {
    let (_state, bridge) = new_bridge();
    let callable = table_with_meta(
        "__call",
        GuestValue::function("call", |_, args| {
            // (self, this, x)
            let x = args.get(2).and_then(|v| v.as_number()).unwrap_or(0.0);
            Ok(vec![GuestValue::Number(x + 1.0)])
        }),
    );

    let f = bridge.to_host(&callable);
    assert!(f.is_function());
    let out = f.call(HostValue::Undefined, vec![HostValue::number(1.0)]).unwrap();
    assert_eq!(out, HostValue::number(2.0));
}

/// Test: the receiver arrives as the first guest argument
#[test]
fn test_receiver_is_first_argument() {
    let (_state, bridge) = new_bridge();
    let read_name = GuestValue::function("read_name", |state, args| {
        let this = args.first().cloned().unwrap_or_default();
        Ok(vec![state.get(&this, &GuestValue::from("name"))?])
    });
    let f = bridge.wrap(&read_name);

    let receiver = HostValue::object();
    receiver.set("name", HostValue::string("widget"));
    let out = f.call(receiver, vec![]).unwrap();
    assert_eq!(out, HostValue::string("widget"));
}

/// Test: only the first guest result is returned; none reads as undefined
#[test]
fn test_single_result_semantics() {
    let (_state, bridge) = new_bridge();
    let many = GuestValue::function("many", |_, _| Ok(vec![1.into(), 2.into()]));
    let none = GuestValue::function("none", |_, _| Ok(vec![]));

    let out = bridge.wrap(&many).call(HostValue::Undefined, vec![]).unwrap();
    assert_eq!(out, HostValue::number(1.0));
    let out = bridge.wrap(&none).call(HostValue::Undefined, vec![]).unwrap();
    assert!(out.is_undefined());
}

/// Test: returned tables are deep-converted
#[test]
fn test_returned_table_converted() {
    let (_state, bridge) = new_bridge();
    let make = GuestValue::function("make", |_, _| {
        let t = guest_runtime::Table::from_sequence(vec!["a".into(), "b".into()]);
        Ok(vec![GuestValue::Table(t)])
    });

    let out = bridge.wrap(&make).call(HostValue::Undefined, vec![]).unwrap();
    assert!(out.is_array());
    assert_eq!(out.to_js_string(), "a,b");
}

/// Test: released proxies fail on every call, even after succeeding before
#[test]
fn test_release_fails_every_time() {
    let (_state, bridge) = new_bridge();
    let f = bridge.wrap(&multiplier(2.0));
    assert!(f.call(HostValue::Undefined, vec![HostValue::number(1.0)]).is_ok());

    let id = bridge.release_function(&f).unwrap();
    assert!(!bridge.is_live(id));
    for _ in 0..3 {
        let err = f
            .call(HostValue::Undefined, vec![HostValue::number(1.0)])
            .unwrap_err();
        assert!(err.message.contains("released function"), "{}", err.message);
    }
}

/// Test: release by id has the same effect as release by handle
#[test]
fn test_release_by_id() {
    let (_state, bridge) = new_bridge();
    let f = bridge.wrap(&multiplier(2.0));
    let id = bridge.proxy_id(&f).unwrap();

    assert!(bridge.release(id));
    assert!(bridge.release_function(&f).is_some());
    assert!(bridge.proxy_function(id).is_none());
    assert!(f.call(HostValue::Undefined, vec![]).is_err());
}

/// Test: wrapping the same closure twice yields independent entries
#[test]
fn test_no_interning() {
    let (_state, bridge) = new_bridge();
    let closure = multiplier(10.0);
    let a = bridge.wrap(&closure);
    let b = bridge.wrap(&closure);

    let id_a = bridge.proxy_id(&a).unwrap();
    let id_b = bridge.proxy_id(&b).unwrap();
    assert_ne!(id_a, id_b);
    assert!(!a.same_ref(&b));
    assert_eq!(bridge.live_proxies(), 2);

    bridge.release(id_a);
    assert!(a.call(HostValue::Undefined, vec![HostValue::number(1.0)]).is_err());
    let out = b.call(HostValue::Undefined, vec![HostValue::number(1.0)]).unwrap();
    assert_eq!(out, HostValue::number(10.0));
}

/// Test: ids keep increasing across releases
#[test]
fn test_ids_monotonic() {
    let (_state, bridge) = new_bridge();
    let ids: Vec<ProxyId> = (0..3)
        .map(|_| {
            let f = bridge.wrap(&multiplier(1.0));
            let id = bridge.proxy_id(&f).unwrap();
            bridge.release(id);
            id
        })
        .collect();
    assert_eq!(ids, vec![ProxyId(1), ProxyId(2), ProxyId(3)]);
}

/// Test: guest errors propagate to the host caller
#[test]
fn test_guest_error_propagates() {
    let (_state, bridge) = new_bridge();
    let failing = GuestValue::function("failing", |_, _| Err(GuestError::runtime("bad input")));
    let err = bridge
        .wrap(&failing)
        .call(HostValue::Undefined, vec![])
        .unwrap_err();
    assert_eq!(err.message, "bad input");
}

/// Test: guest -> host -> guest reentrancy through a host callback
#[test]
fn test_reentrant_callback() {
    let (state, bridge) = new_bridge();

    // function(this, cb) return cb(20) + 1 end
    let apply = GuestValue::function("apply", |state, args| {
        let cb = args.get(1).cloned().unwrap_or_default();
        let r = state.call_single(&cb, vec![20.into()])?;
        Ok(vec![GuestValue::Number(r.as_number().unwrap_or(0.0) + 1.0)])
    });
    let apply = bridge.wrap(&apply);

    // The host callback is itself a proxy of a guest closure
    let double = bridge.wrap(&multiplier(2.0));
    let out = apply.call(HostValue::Undefined, vec![double]).unwrap();
    assert_eq!(out, HostValue::number(41.0));
    assert_eq!(state.top(), 0);
}

/// Test: unbounded host/guest recursion ends in an error, not a crash
#[test]
fn test_recursion_is_bounded() {
    let state = GuestState::with_max_call_depth(16);
    let bridge = Bridge::install_default(&state).unwrap();

    // function(this, self_fn) return self_fn(self_fn) end
    let recurse = GuestValue::function("recurse", |state, args| {
        let me = args.get(1).cloned().unwrap_or_default();
        Ok(vec![state.call_single(&me, vec![me.clone()])?])
    });
    let f = bridge.wrap(&recurse);
    let err = f.call(HostValue::Undefined, vec![f.clone()]).unwrap_err();
    assert!(err.message.contains("call depth exceeded"), "{}", err.message);
    assert_eq!(state.top(), 0);
}

/// Test: a failed call leaves the guest stack balanced
#[test]
fn test_stack_balanced_after_error() {
    let (state, bridge) = new_bridge();
    let failing = GuestValue::function("failing", |_, _| Err(GuestError::runtime("x")));
    let f = bridge.wrap(&failing);
    for _ in 0..3 {
        assert!(f.call(HostValue::Undefined, vec![HostValue::number(1.0)]).is_err());
    }
    assert_eq!(state.top(), 0);
}
