use criterion::{criterion_group, criterion_main, Criterion};
use shelf_core::{BookRecord, MemoryStore, Shelf};

fn bench_add_remove(c: &mut Criterion) {
    let book = BookRecord::new("A1", "Dune").with_authors(["Frank Herbert"]);
    c.bench_function("add_remove_persisted", |b| {
        let mut shelf = Shelf::open(MemoryStore::new());
        for i in 0..200 {
            shelf.add_to_category(BookRecord::new(format!("F{i}"), "Filler"), "Ciencia Ficción").unwrap();
        }
        b.iter(|| {
            shelf.add_to_category(book.clone(), "Ciencia Ficción").unwrap();
            shelf.remove_from_category("A1", "Ciencia Ficción").unwrap();
        })
    });
}

criterion_group!(benches, bench_add_remove);
criterion_main!(benches);
