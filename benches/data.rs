use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use yangtree::context::{Context, ContextFlags};
use yangtree::data::{
    Data, DataDiffFlags, DataFormat, DataParserFlags, DataPrinterFlags,
    DataTree, DataValidationFlags,
};
use yangtree::schema::{DataValueType, SchemaSpec};
use yangtree::sort::SearchKey;

fn create_context() -> Context {
    let mut builder = SchemaSpec::builder();
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
        .leaf(iface, "type", DataValueType::String)
        .expect("Failed to create leaf");
    builder
        .leaf(iface, "enabled", DataValueType::Bool)
        .expect("Failed to create leaf");

    Context::new(
        builder.build().expect("Failed to build schema"),
        ContextFlags::empty(),
    )
}

fn data_generate(ctx: &Context, interfaces: u32) -> DataTree<'_> {
    let module = ctx
        .get_module("ietf-interfaces")
        .expect("Failed to lookup module");
    let mut dtree = DataTree::new(ctx);
    let ifs = dtree
        .new_inner(None, Some(&module), "interfaces")
        .expect("Failed to create container");

    for i in 1..=interfaces {
        let name = format!("eth{}", i);
        let entry = dtree
            .new_list(Some(ifs), None, "interface", &[&name])
            .expect("Failed to create list instance");
        dtree
            .new_term(Some(entry), None, "type", Some("ethernetCsmacd"))
            .expect("Failed to create leaf");
        dtree
            .new_term(Some(entry), None, "enabled", Some("true"))
            .expect("Failed to create leaf");
    }

    dtree
}

fn criterion_benchmark(c: &mut Criterion) {
    let tree_sizes = [1024, 2 * 1024, 4 * 1024, 8 * 1024, 16 * 1024];

    // Initialize context.
    let ctx = create_context();

    // Prepare DataTree search benchmark.
    let mut group = c.benchmark_group("DataNodeRef.find_child() / tree size");
    for size in &tree_sizes {
        // Create artificial data tree.
        let dtree = data_generate(&ctx, *size);
        let ifs = dtree.reference().expect("Empty data tree");

        // Run benchmark.
        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            size,
            |b, size| {
                b.iter(|| {
                    for i in 1..=*size {
                        let name = format!("eth{}", i);
                        ifs.find_child(
                            "interface",
                            SearchKey::Keys(&[&name]),
                        )
                        .expect("Failed to find list instance");
                    }
                });
            },
        );
    }
    group.finish();

    // Prepare DataTree.sort() benchmark.
    let mut group = c.benchmark_group("DataTree.sort() / tree size");
    for size in &tree_sizes {
        let dtree = data_generate(&ctx, *size);

        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            size,
            |b, _| {
                b.iter(|| {
                    let mut dup = dtree.duplicate();
                    dup.sort();
                });
            },
        );
    }
    group.finish();

    // Prepare DataTree.diff() benchmark.
    let mut group = c.benchmark_group("DataTree.diff() / tree size");
    for size in &tree_sizes {
        let dtree = data_generate(&ctx, *size);
        let dtree_base = data_generate(&ctx, *size + 1024);

        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            size,
            |b, _| {
                b.iter(|| {
                    dtree
                        .diff(&dtree_base, DataDiffFlags::empty())
                        .expect("Failed to compare data trees");
                });
            },
        );
    }
    group.finish();

    // Prepare codec round-trip benchmark.
    let mut group = c.benchmark_group("JSON round-trip / tree size");
    for size in &tree_sizes {
        let dtree = data_generate(&ctx, *size);
        let json = dtree
            .print_string(
                DataFormat::JSON,
                DataPrinterFlags::WITH_SIBLINGS | DataPrinterFlags::SHRINK,
            )
            .expect("Failed to print data");

        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            size,
            |b, _| {
                b.iter(|| {
                    DataTree::parse_string(
                        &ctx,
                        &json,
                        DataFormat::JSON,
                        DataParserFlags::empty(),
                        DataValidationFlags::empty(),
                    )
                    .expect("Failed to parse data tree");
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
