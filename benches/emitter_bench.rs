use criterion::{criterion_group, criterion_main, Criterion};
use streamson::{Emitter, EmitterSink, Path};

struct NullSink;

impl EmitterSink for NullSink {
    fn on_start(&mut self, _path: &Path) {}
    fn on_bytes(&mut self, _bytes: &[u8]) {}
    fn on_end(&mut self, _path: &Path) {}
    fn on_separator(&mut self, _bytes: &[u8]) {}
}

fn large_array(n: usize) -> Vec<u8> {
    let mut s = String::from("[");
    for i in 0..n {
        if i > 0 {
            s.push(',');
        }
        s.push_str(&format!(r#"{{"id":{i},"name":"item-{i}","active":true}}"#));
    }
    s.push(']');
    s.into_bytes()
}

fn bench_emitter(c: &mut Criterion) {
    let mut group = c.benchmark_group("emitter");
    let doc = large_array(2_000);
    group.bench_function("whole_chunk", |b| {
        b.iter(|| {
            let mut sink = NullSink;
            let mut emitter = Emitter::new();
            emitter
                .process(std::hint::black_box(&doc), &mut sink)
                .unwrap();
            emitter.terminate(&mut sink).unwrap();
        })
    });
    group.bench_function("byte_at_a_time", |b| {
        b.iter(|| {
            let mut sink = NullSink;
            let mut emitter = Emitter::new();
            for byte in doc.iter() {
                emitter.process(std::slice::from_ref(byte), &mut sink).unwrap();
            }
            emitter.terminate(&mut sink).unwrap();
        })
    });
    group.finish();
}

criterion_group!(benches, bench_emitter);
criterion_main!(benches);
