use criterion::{black_box, criterion_group, criterion_main, Criterion};
use scribe_dom::Dom;
use scribe_render::{dom, text, RendererRegistry};
use scribe_tree::{kinds, DocumentTree, NodeSpec};

fn document(paragraphs: usize) -> DocumentTree {
    let specs = (0..paragraphs).map(|i| {
        let mut paragraph = NodeSpec::new(kinds::PARAGRAPH).with_text("The quick brown fox ");
        if i % 3 == 0 {
            paragraph = paragraph.with_children(
                NodeSpec::text("jumps")
                    .into_iter()
                    .map(|c| c.with_attr("bold", "true")),
            );
        }
        paragraph.with_text(" over the lazy dog.")
    });
    DocumentTree::from_specs(specs).unwrap()
}

fn render_dom(c: &mut Criterion) {
    let tree = document(200);
    let mut registry = RendererRegistry::new();
    registry.add_engine(dom::DOM, &[]).unwrap();
    dom::register_stock_renderers(&mut registry, dom::DOM, dom::TagTable::default(), "span").unwrap();
    let engine = registry.engine(dom::DOM).unwrap();

    c.bench_function("render_dom_200_paragraphs", |b| {
        b.iter(|| {
            let mut target = Dom::new();
            engine.render_detached(black_box(&tree), &mut target, &[tree.root()])
        })
    });
}

fn render_text(c: &mut Criterion) {
    let tree = document(200);
    let mut registry = RendererRegistry::new();
    registry.add_engine(text::TEXT_PLAIN, &[]).unwrap();
    text::register_stock_renderers(&mut registry).unwrap();

    c.bench_function("render_text_200_paragraphs", |b| {
        b.iter(|| text::render_to_string(&registry, text::TEXT_PLAIN, black_box(&tree)))
    });
}

criterion_group!(benches, render_dom, render_text);
criterion_main!(benches);
