use yangtree::context::{Context, ContextFlags};
use yangtree::data::{
    Data, DataFormat, DataParserFlags, DataPrinterFlags, DataTree,
    DataValidationFlags,
};
use yangtree::iter::NodeIterable;
use yangtree::schema::{DataValueType, SchemaSpec};
use yangtree::ErrorTag;

static NS_IF: &str = "urn:ietf:params:xml:ns:yang:ietf-interfaces";

fn create_context() -> Context {
    let mut builder = SchemaSpec::builder();

    let m = builder
        .module("ietf-interfaces", NS_IF, "if")
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

    let ex = builder
        .module("clixon-example", "urn:example:clixon", "ex")
        .expect("Failed to create module");
    let rpc = builder.rpc(ex, "example").expect("Failed to create rpc");
    let input = builder.input(rpc);
    let x = builder
        .leaf(input, "x", DataValueType::Uint32)
        .expect("Failed to create leaf");
    builder.mandatory(x);

    Context::new(
        builder.build().expect("Failed to build schema"),
        ContextFlags::empty(),
    )
}

fn parse_xml_data<'a>(ctx: &'a Context, string: &str) -> DataTree<'a> {
    DataTree::parse_string(
        ctx,
        string,
        DataFormat::XML,
        DataParserFlags::empty(),
        DataValidationFlags::empty(),
    )
    .expect("Failed to parse data tree")
}

#[test]
fn xml_shrink_roundtrip() {
    let ctx = create_context();
    let input = r#"<interfaces xmlns="urn:ietf:params:xml:ns:yang:ietf-interfaces"><interface><name>eth0</name><description>up &amp; running</description></interface></interfaces>"#;
    let dtree = parse_xml_data(&ctx, input);

    assert_eq!(
        dtree
            .print_string(
                DataFormat::XML,
                DataPrinterFlags::WITH_SIBLINGS | DataPrinterFlags::SHRINK,
            )
            .expect("Failed to print data"),
        input
    );
}

#[test]
fn xml_pretty_print() {
    let ctx = create_context();
    let dtree = parse_xml_data(
        &ctx,
        r#"<interfaces xmlns="urn:ietf:params:xml:ns:yang:ietf-interfaces"><interface><name>eth0</name></interface></interfaces>"#,
    );

    assert_eq!(
        dtree
            .print_string(
                DataFormat::XML,
                DataPrinterFlags::WITH_SIBLINGS,
            )
            .expect("Failed to print data"),
        r#"<interfaces xmlns="urn:ietf:params:xml:ns:yang:ietf-interfaces">
  <interface>
    <name>eth0</name>
  </interface>
</interfaces>
"#
    );
}

#[test]
fn xml_prefixed_elements() {
    let ctx = create_context();
    let input = r#"<if:interfaces xmlns:if="urn:ietf:params:xml:ns:yang:ietf-interfaces"><if:interface><if:name>eth0</if:name></if:interface></if:interfaces>"#;
    let dtree = parse_xml_data(&ctx, input);

    // Prefixed elements resolve and bind like default-namespace ones.
    let root = dtree.reference().expect("Empty data tree");
    assert_eq!(root.prefix(), Some("if"));
    assert_eq!(root.namespace().as_deref(), Some(NS_IF));
    assert!(root.schema().is_some());

    let name = root
        .first_child()
        .and_then(|iface| iface.first_child())
        .expect("Failed to find leaf");
    assert_eq!(name.namespace().as_deref(), Some(NS_IF));
    assert_eq!(name.value_canonical(), Some("eth0"));

    // The prefix form survives printing.
    assert_eq!(
        dtree
            .print_string(
                DataFormat::XML,
                DataPrinterFlags::WITH_SIBLINGS | DataPrinterFlags::SHRINK,
            )
            .expect("Failed to print data"),
        input
    );
}

#[test]
fn xml_cdata_preserved() {
    let ctx = create_context();
    let input = r#"<interfaces xmlns="urn:ietf:params:xml:ns:yang:ietf-interfaces"><interface><name>eth0</name><description><![CDATA[5 < 7 & "quoted"]]></description></interface></interfaces>"#;
    let dtree = parse_xml_data(&ctx, input);

    assert_eq!(
        dtree
            .print_string(
                DataFormat::XML,
                DataPrinterFlags::WITH_SIBLINGS | DataPrinterFlags::SHRINK,
            )
            .expect("Failed to print data"),
        input
    );
}

#[test]
fn xml_malformed_input() {
    let ctx = create_context();
    let err = DataTree::parse_string(
        &ctx,
        "<a><b></a>",
        DataFormat::XML,
        DataParserFlags::empty(),
        DataValidationFlags::empty(),
    )
    .expect_err("Parsing should have failed");
    assert_eq!(err.tag, ErrorTag::MalformedMessage);
    assert!(err
        .msg
        .as_deref()
        .expect("Missing error message")
        .contains("line 1"));

    let err = DataTree::parse_string(
        &ctx,
        "<a><b>",
        DataFormat::XML,
        DataParserFlags::empty(),
        DataValidationFlags::empty(),
    )
    .expect_err("Parsing should have failed");
    assert_eq!(err.tag, ErrorTag::MalformedMessage);
}

#[test]
fn xml_rpc_error_rendering() {
    let ctx = create_context();
    let err = DataTree::parse_op_string(
        &ctx,
        r#"<example xmlns="urn:example:clixon"/>"#,
        DataFormat::XML,
        yangtree::data::DataOperation::RpcYang,
    )
    .expect_err("Validation should have failed");

    assert_eq!(
        err.to_rpc_error_xml(),
        "<rpc-error>\
         <error-type>application</error-type>\
         <error-tag>missing-element</error-tag>\
         <error-severity>error</error-severity>\
         <error-message>Mandatory variable</error-message>\
         <error-info><bad-element>x</bad-element></error-info>\
         </rpc-error>"
    );
}

#[test]
fn xml_attributes_kept_out_of_ordering() {
    let ctx = create_context();
    let input = r#"<interfaces xmlns="urn:ietf:params:xml:ns:yang:ietf-interfaces" xmlns:nc="urn:ietf:params:xml:ns:netconf:base:1.0"><interface nc:operation="merge"><name>eth0</name></interface></interfaces>"#;
    let dtree = parse_xml_data(&ctx, input);

    let iface = dtree
        .reference()
        .expect("Empty data tree")
        .first_child()
        .expect("Failed to find list instance");
    assert_eq!(iface.attributes().len(), 1);
    assert_eq!(iface.attributes()[0].name, "operation");
    assert_eq!(iface.attributes()[0].prefix.as_deref(), Some("nc"));
    assert_eq!(iface.attributes()[0].value, "merge");

    // Attributes are not children: ordering only sees the name leaf.
    assert_eq!(iface.children().count(), 1);
    assert_eq!(
        dtree
            .print_string(
                DataFormat::XML,
                DataPrinterFlags::WITH_SIBLINGS | DataPrinterFlags::SHRINK,
            )
            .expect("Failed to print data"),
        input
    );
}
