use yangtree::context::{Context, ContextFlags};
use yangtree::data::{
    Data, DataFormat, DataParserFlags, DataPrinterFlags, DataTree,
    DataValidationFlags,
};
use yangtree::schema::{DataValueType, SchemaSpec};
use yangtree::ErrorTag;

fn build_schema(builder: &mut yangtree::schema::SchemaSpecBuilder) {
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
    builder
        .leaf(iface, "enabled", DataValueType::Bool)
        .expect("Failed to create leaf");
    builder
        .leaf(iface, "mtu", DataValueType::Uint16)
        .expect("Failed to create leaf");

    let ex = builder
        .module("clixon-example", "urn:example:clixon", "ex")
        .expect("Failed to create module");
    builder
        .leaf(ex, "flag", DataValueType::Empty)
        .expect("Failed to create leaf");
    let metrics = builder
        .container(ex, "metrics")
        .expect("Failed to create container");
    builder
        .leaf_list(metrics, "values", DataValueType::Int32)
        .expect("Failed to create leaf-list");
}

fn create_context() -> Context {
    create_context_with(ContextFlags::empty())
}

fn create_context_with(options: ContextFlags) -> Context {
    let mut builder = SchemaSpec::builder();
    build_schema(&mut builder);
    Context::new(builder.build().expect("Failed to build schema"), options)
}

fn parse_json_data<'a>(ctx: &'a Context, string: &str) -> DataTree<'a> {
    DataTree::parse_string(
        ctx,
        string,
        DataFormat::JSON,
        DataParserFlags::empty(),
        DataValidationFlags::empty(),
    )
    .expect("Failed to parse data tree")
}

fn print_json(dtree: &DataTree<'_>, shrink: bool) -> String {
    let mut options = DataPrinterFlags::WITH_SIBLINGS;
    if shrink {
        options |= DataPrinterFlags::SHRINK;
    }
    dtree
        .print_string(DataFormat::JSON, options)
        .expect("Failed to print data")
}

#[test]
fn json_roundtrip_canonicalizes() {
    let ctx = create_context();
    let dtree = parse_json_data(
        &ctx,
        r#"{"ietf-interfaces:interfaces":{"interface":[{"enabled":true,"name":"eth0","mtu":1500}]}}"#,
    );

    // Members come back in schema order; arrays and value quoting are
    // driven by the resolved types.
    let canonical = r#"{"ietf-interfaces:interfaces":{"interface":[{"name":"eth0","enabled":true,"mtu":1500}]}}"#;
    assert_eq!(print_json(&dtree, true), canonical);

    // Canonical output is a fixed point.
    let dtree = parse_json_data(&ctx, canonical);
    assert_eq!(print_json(&dtree, true), canonical);
}

#[test]
fn json_xml_cross_codec_roundtrip() {
    let ctx = create_context();
    let json = r#"{"ietf-interfaces:interfaces":{"interface":[{"name":"eth0","enabled":false},{"name":"eth1","mtu":9000}]}}"#;
    let dtree = parse_json_data(&ctx, json);

    let xml = dtree
        .print_string(
            DataFormat::XML,
            DataPrinterFlags::WITH_SIBLINGS | DataPrinterFlags::SHRINK,
        )
        .expect("Failed to print data");
    assert_eq!(
        xml,
        r#"<interfaces xmlns="urn:ietf:params:xml:ns:yang:ietf-interfaces"><interface><name>eth0</name><enabled>false</enabled></interface><interface><name>eth1</name><mtu>9000</mtu></interface></interfaces>"#
    );

    let dtree2 = DataTree::parse_string(
        &ctx,
        &xml,
        DataFormat::XML,
        DataParserFlags::empty(),
        DataValidationFlags::empty(),
    )
    .expect("Failed to parse data tree");
    assert_eq!(print_json(&dtree2, true), json);
}

#[test]
fn json_pretty_print() {
    let ctx = create_context();
    let dtree = parse_json_data(
        &ctx,
        r#"{"ietf-interfaces:interfaces":{"interface":[{"name":"eth0"}]}}"#,
    );

    assert_eq!(
        print_json(&dtree, false),
        r#"{
  "ietf-interfaces:interfaces": {
    "interface": [
      {
        "name": "eth0"
      }
    ]
  }
}"#
    );
}

#[test]
fn json_leaflist_array() {
    let ctx = create_context();
    let dtree = parse_json_data(
        &ctx,
        r#"{"clixon-example:metrics":{"values":[3,1,2]}}"#,
    );

    assert_eq!(
        print_json(&dtree, true),
        r#"{"clixon-example:metrics":{"values":[1,2,3]}}"#
    );
    assert_eq!(
        print_json(&dtree, false),
        r#"{
  "clixon-example:metrics": {
    "values": [
      1,
      2,
      3
    ]
  }
}"#
    );
}

#[test]
fn json_empty_leaf() {
    let ctx = create_context();
    let dtree =
        parse_json_data(&ctx, r#"{"clixon-example:flag":[null]}"#);

    assert_eq!(
        dtree
            .print_string(
                DataFormat::XML,
                DataPrinterFlags::WITH_SIBLINGS | DataPrinterFlags::SHRINK,
            )
            .expect("Failed to print data"),
        r#"<flag xmlns="urn:example:clixon"/>"#
    );
    assert_eq!(print_json(&dtree, true), r#"{"clixon-example:flag":[null]}"#);
}

#[test]
fn json_identityref_rewrite() {
    let ctx = create_context();
    let json = r#"{"ietf-interfaces:interfaces":{"interface":[{"name":"eth0","type":"iana-if-type:ethernetCsmacd"}]}}"#;
    let dtree = parse_json_data(&ctx, json);

    // The intermediate XML carries the identity's module namespace via a
    // synthesized prefix declaration on the leaf.
    let xml = dtree
        .print_string(
            DataFormat::XML,
            DataPrinterFlags::WITH_SIBLINGS | DataPrinterFlags::SHRINK,
        )
        .expect("Failed to print data");
    assert_eq!(
        xml,
        r#"<interfaces xmlns="urn:ietf:params:xml:ns:yang:ietf-interfaces"><interface><name>eth0</name><type xmlns:ianaift="urn:ietf:params:xml:ns:yang:iana-if-type">ianaift:ethernetCsmacd</type></interface></interfaces>"#
    );

    // Re-encoding restores the module-qualified value.
    assert_eq!(print_json(&dtree, true), json);

    // The XML flavor decodes to the same tree.
    let dtree2 = DataTree::parse_string(
        &ctx,
        &xml,
        DataFormat::XML,
        DataParserFlags::empty(),
        DataValidationFlags::empty(),
    )
    .expect("Failed to parse data tree");
    assert_eq!(print_json(&dtree2, true), json);
}

#[test]
fn json_identityref_same_module_unqualified() {
    let ctx = create_context();
    // An identity from the leaf's own module stays unqualified.
    let json = r#"{"ietf-interfaces:interfaces":{"interface":[{"name":"eth0","type":"loopback"}]}}"#;
    let dtree = parse_json_data(&ctx, json);
    assert_eq!(print_json(&dtree, true), json);
}

#[test]
fn json_missing_top_level_qualifier() {
    let ctx = create_context();
    let err = DataTree::parse_string(
        &ctx,
        r#"{"interfaces":{}}"#,
        DataFormat::JSON,
        DataParserFlags::empty(),
        DataValidationFlags::empty(),
    )
    .expect_err("Parsing should have failed");
    assert_eq!(err.tag, ErrorTag::MalformedMessage);
    assert!(err
        .msg
        .as_deref()
        .expect("Missing error message")
        .contains("module qualifier"));
}

#[test]
fn json_unknown_module() {
    let ctx = create_context();
    let err = DataTree::parse_string(
        &ctx,
        r#"{"no-such-module:interfaces":{}}"#,
        DataFormat::JSON,
        DataParserFlags::empty(),
        DataValidationFlags::empty(),
    )
    .expect_err("Parsing should have failed");
    assert_eq!(err.tag, ErrorTag::UnknownElement);
    assert!(err
        .msg
        .as_deref()
        .expect("Missing error message")
        .contains("No module found"));
}

#[test]
fn json_syntax_error_position() {
    let ctx = create_context();
    let err = DataTree::parse_string(
        &ctx,
        "{\n  \"ietf-interfaces:interfaces\": {,}\n}",
        DataFormat::JSON,
        DataParserFlags::empty(),
        DataValidationFlags::empty(),
    )
    .expect_err("Parsing should have failed");
    assert_eq!(err.tag, ErrorTag::MalformedMessage);
    assert!(err
        .msg
        .as_deref()
        .expect("Missing error message")
        .starts_with("line 2 "));
}

#[test]
fn json_invalid_identityref() {
    let json = r#"{"ietf-interfaces:interfaces":{"interface":[{"name":"eth0","type":"no-such-module:foo"}]}}"#;

    let ctx = create_context();
    let err = DataTree::parse_string(
        &ctx,
        json,
        DataFormat::JSON,
        DataParserFlags::empty(),
        DataValidationFlags::empty(),
    )
    .expect_err("Parsing should have failed");
    assert_eq!(err.tag, ErrorTag::InvalidValue);
    assert_eq!(err.apptag.as_deref(), Some("invalid-identityref"));

    // The opt-in compatibility mode keeps the value verbatim.
    let ctx = create_context_with(ContextFlags::IDENTITYREF_KLUDGE);
    let dtree = parse_json_data(&ctx, json);
    assert_eq!(print_json(&dtree, true), json);
}

#[test]
fn json_cdata_unwrapped() {
    let ctx = create_context();
    let dtree = DataTree::parse_string(
        &ctx,
        r#"<interfaces xmlns="urn:ietf:params:xml:ns:yang:ietf-interfaces"><interface><name>eth0</name><description><![CDATA[a <b> & "c"]]></description></interface></interfaces>"#,
        DataFormat::XML,
        DataParserFlags::empty(),
        DataValidationFlags::empty(),
    )
    .expect("Failed to parse data tree");

    assert_eq!(
        print_json(&dtree, true),
        r#"{"ietf-interfaces:interfaces":{"interface":[{"name":"eth0","description":"a <b> & \"c\""}]}}"#
    );
}
