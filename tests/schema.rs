use std::cmp::Ordering;

use yangtree::context::{Context, ContextFlags};
use yangtree::schema::{
    DataValue, DataValueType, Decimal64, SchemaNodeKind, SchemaSpec,
};

fn create_context() -> Context {
    let mut builder = SchemaSpec::builder();

    builder
        .module(
            "iana-if-type",
            "urn:ietf:params:xml:ns:yang:iana-if-type",
            "ianaift",
        )
        .expect("Failed to create module");

    let m = builder
        .module(
            "ietf-interfaces",
            "urn:ietf:params:xml:ns:yang:ietf-interfaces",
            "if",
        )
        .expect("Failed to create module");
    let ifs = builder
        .container(m, "interfaces")
        .expect("Failed to create container");
    let iface = builder
        .list(ifs, "interface", &["name"])
        .expect("Failed to create list");
    builder
        .leaf(iface, "name", DataValueType::String)
        .expect("Failed to create leaf");
    builder
        .leaf(iface, "description", DataValueType::String)
        .expect("Failed to create leaf");
    builder
        .leaf(iface, "type", DataValueType::IdentityRef)
        .expect("Failed to create leaf");
    let enabled = builder
        .leaf(iface, "enabled", DataValueType::Bool)
        .expect("Failed to create leaf");
    builder.default_value(enabled, "true");
    builder
        .leaf(iface, "mtu", DataValueType::Uint16)
        .expect("Failed to create leaf");

    let ex = builder
        .module("clixon-example", "urn:example:clixon", "ex")
        .expect("Failed to create module");
    let rpc = builder.rpc(ex, "example").expect("Failed to create rpc");
    let input = builder.input(rpc);
    let x = builder
        .leaf(input, "x", DataValueType::Uint32)
        .expect("Failed to create leaf");
    builder.mandatory(x);
    let y = builder
        .leaf(input, "y", DataValueType::Uint32)
        .expect("Failed to create leaf");
    builder.default_value(y, "42");

    let target = builder
        .container(ex, "target")
        .expect("Failed to create container");
    let choice = builder
        .choice(target, "config-target")
        .expect("Failed to create choice");
    builder.mandatory(choice);
    builder
        .leaf(choice, "candidate", DataValueType::Empty)
        .expect("Failed to create leaf");
    builder
        .leaf(choice, "running", DataValueType::Empty)
        .expect("Failed to create leaf");

    let servers = builder
        .container(ex, "servers")
        .expect("Failed to create container");
    let server = builder
        .list(servers, "server", &["name", "port"])
        .expect("Failed to create list");
    builder
        .leaf(server, "name", DataValueType::String)
        .expect("Failed to create leaf");
    builder
        .leaf(server, "port", DataValueType::Uint16)
        .expect("Failed to create leaf");
    let ratio = builder
        .leaf(server, "ratio", DataValueType::Dec64)
        .expect("Failed to create leaf");
    builder
        .fraction_digits(ratio, 2)
        .expect("Failed to set fraction-digits");

    Context::new(
        builder.build().expect("Failed to build schema"),
        ContextFlags::empty(),
    )
}

#[test]
fn schema_module_lookup() {
    let ctx = create_context();

    assert!(ctx.get_module("ietf-interfaces").is_some());
    assert!(ctx.get_module("no-such-module").is_none());
    assert_eq!(
        ctx.get_module_by_namespace("urn:example:clixon")
            .expect("Failed to lookup module")
            .name(),
        "clixon-example"
    );
    assert_eq!(
        ctx.get_module_by_prefix("if")
            .expect("Failed to lookup module")
            .prefix(),
        "if"
    );
    assert_eq!(ctx.modules().count(), 3);
}

#[test]
fn schema_node_accessors() {
    let ctx = create_context();
    let module = ctx
        .get_module("ietf-interfaces")
        .expect("Failed to lookup module");

    let ifs = module.find_top("interfaces").expect("Failed to find node");
    assert_eq!(ifs.kind(), SchemaNodeKind::Container);
    assert_eq!(ifs.module().name(), "ietf-interfaces");
    assert!(ifs.is_config());

    let iface = ifs.find_data_child("interface").expect("Failed to find node");
    assert_eq!(iface.kind(), SchemaNodeKind::List);
    assert_eq!(iface.list_keys().collect::<Vec<_>>(), vec!["name"]);

    let name = iface.find_data_child("name").expect("Failed to find node");
    assert!(name.is_list_key());
    let mtu = iface.find_data_child("mtu").expect("Failed to find node");
    assert!(!mtu.is_list_key());

    let enabled =
        iface.find_data_child("enabled").expect("Failed to find node");
    assert!(enabled.has_default());
    assert_eq!(enabled.default_value_canonical(), Some("true"));
    assert_eq!(enabled.default_value(), Some(DataValue::Bool(true)));

    assert_eq!(
        iface.path(),
        "/ietf-interfaces:interfaces/ietf-interfaces:interface"
    );
}

#[test]
fn schema_order_indices() {
    let ctx = create_context();
    let module = ctx
        .get_module("ietf-interfaces")
        .expect("Failed to lookup module");
    let iface = module
        .find_top("interfaces")
        .and_then(|ifs| ifs.find_data_child("interface"))
        .expect("Failed to find node");

    let order: Vec<(String, usize)> = iface
        .data_children()
        .into_iter()
        .map(|snode| (snode.name().to_string(), snode.order()))
        .collect();
    assert_eq!(
        order,
        vec![
            ("name".to_string(), 0),
            ("description".to_string(), 1),
            ("type".to_string(), 2),
            ("enabled".to_string(), 3),
            ("mtu".to_string(), 4),
        ]
    );
}

#[test]
fn schema_choice_expansion() {
    let ctx = create_context();
    let module = ctx
        .get_module("clixon-example")
        .expect("Failed to lookup module");
    let target = module.find_top("target").expect("Failed to find node");

    // The choice/case wrappers are transparent to data-node resolution
    // and to the order indices.
    let candidate =
        target.find_data_child("candidate").expect("Failed to find node");
    let running =
        target.find_data_child("running").expect("Failed to find node");
    assert_eq!(candidate.order(), 0);
    assert_eq!(running.order(), 1);

    let choice = candidate.choice_parent().expect("Failed to find choice");
    assert_eq!(choice.kind(), SchemaNodeKind::Choice);
    assert_eq!(choice.name(), "config-target");
    assert!(choice.is_mandatory());
    assert_eq!(running.choice_parent(), Some(choice));
}

#[test]
fn schema_rpc_resolution() {
    let ctx = create_context();
    let module = ctx
        .get_module("clixon-example")
        .expect("Failed to lookup module");
    let rpc = module.find_top("example").expect("Failed to find node");
    assert_eq!(rpc.kind(), SchemaNodeKind::Rpc);

    let input = rpc.input().expect("Failed to find input");
    let x = input.find_data_child("x").expect("Failed to find node");
    assert!(x.is_mandatory());
    let y = input.find_data_child("y").expect("Failed to find node");
    assert_eq!(y.default_value(), Some(DataValue::Uint32(42)));

    // The rpc node itself resolves no data children directly.
    assert!(rpc.find_data_child("x").is_none());
}

#[test]
fn value_parse_integers() {
    let ctx = create_context();
    let mtu = ctx
        .get_module("ietf-interfaces")
        .and_then(|module| module.find_top("interfaces"))
        .and_then(|ifs| ifs.find_data_child("interface"))
        .and_then(|iface| iface.find_data_child("mtu"))
        .expect("Failed to find node");
    let ltype = mtu.leaf_type().expect("Failed to resolve type");

    assert_eq!(ltype.base_type(), DataValueType::Uint16);
    assert_eq!(
        DataValue::parse("1500", &ltype),
        Ok(DataValue::Uint16(1500))
    );
    assert!(DataValue::parse("70000", &ltype).is_err());
    assert!(DataValue::parse("-1", &ltype).is_err());
    assert!(DataValue::parse("abc", &ltype).is_err());
}

#[test]
fn value_parse_decimal64() {
    let ctx = create_context();
    let ratio = ctx
        .get_module("clixon-example")
        .and_then(|module| module.find_top("servers"))
        .and_then(|servers| servers.find_data_child("server"))
        .and_then(|server| server.find_data_child("ratio"))
        .expect("Failed to find node");
    let ltype = ratio.leaf_type().expect("Failed to resolve type");
    assert_eq!(ltype.base_type(), DataValueType::Dec64);
    assert_eq!(ltype.fraction_digits(), 2);

    let parsed = DataValue::parse("1.5", &ltype).expect("Failed to parse");
    assert_eq!(parsed, DataValue::Dec64(Decimal64::from_scaled(150, 2)));
    assert_eq!(parsed.to_string(), "1.50");
    assert_eq!(
        DataValue::parse("-0.25", &ltype)
            .expect("Failed to parse")
            .to_string(),
        "-0.25"
    );

    // Fractional scale is honored by the ordering.
    let low = DataValue::parse("1.49", &ltype).expect("Failed to parse");
    let high = DataValue::parse("1.5", &ltype).expect("Failed to parse");
    assert_eq!(low.partial_cmp(&high), Some(Ordering::Less));

    // More fraction digits than the type allows.
    assert!(DataValue::parse("1.505", &ltype).is_err());
    assert!(DataValue::parse("1.5.0", &ltype).is_err());
}

#[test]
fn value_parse_bool_and_empty() {
    let ctx = create_context();
    let module = ctx
        .get_module("ietf-interfaces")
        .expect("Failed to lookup module");
    let enabled = module
        .find_top("interfaces")
        .and_then(|ifs| ifs.find_data_child("interface"))
        .and_then(|iface| iface.find_data_child("enabled"))
        .expect("Failed to find node");
    let ltype = enabled.leaf_type().expect("Failed to resolve type");
    assert_eq!(DataValue::parse("true", &ltype), Ok(DataValue::Bool(true)));
    assert_eq!(
        DataValue::parse("false", &ltype),
        Ok(DataValue::Bool(false))
    );
    assert!(DataValue::parse("True", &ltype).is_err());

    let candidate = ctx
        .get_module("clixon-example")
        .and_then(|module| module.find_top("target"))
        .and_then(|target| target.find_data_child("candidate"))
        .expect("Failed to find node");
    let ltype = candidate.leaf_type().expect("Failed to resolve type");
    assert_eq!(DataValue::parse("", &ltype), Ok(DataValue::Empty));
    assert!(DataValue::parse("x", &ltype).is_err());
}

#[test]
fn builder_rejects_inconsistencies() {
    let mut builder = SchemaSpec::builder();
    let m = builder
        .module("m", "urn:m", "m")
        .expect("Failed to create module");
    assert!(builder.module("m", "urn:other", "o").is_err());

    let c = builder
        .container(m, "c")
        .expect("Failed to create container");
    assert!(builder.container(m, "c").is_err());

    let leaf = builder
        .leaf(c, "leaf", DataValueType::String)
        .expect("Failed to create leaf");
    assert!(builder.container(leaf, "under-leaf").is_err());
    assert!(builder.fraction_digits(leaf, 2).is_err());

    // Declared key without a matching leaf fails at build time.
    builder
        .list(c, "broken", &["id"])
        .expect("Failed to create list");
    assert!(builder.build().is_err());
}
