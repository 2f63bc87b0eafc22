// benches/benchmarks.rs - Performance benchmarks (criterion)
//
// Hot paths on the receive side:
//   1. Stream decoding - bytes from the network to chunks, at different read sizes
//   2. Event fan-out - emit to a bus with many listeners
//   3. Push record parsing - one WebSocket text frame to a typed update

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dojo::client::{SseLineDecoder, StreamDecoder};
use dojo::events::{ClientEvent, EventBus, EventKind};
use dojo::realtime::{ConnectionStatus, PushUpdate};

// ─── Helpers ────────────────────────────────────────────────────────────────

/// A reply of `n` deltas terminated by `[DONE]`.
fn stream_body(n: usize) -> Vec<u8> {
    let mut body = String::new();
    for i in 0..n {
        body.push_str(&format!(
            "data: {{\"type\":\"content_delta\",\"delta\":\"token {i} \",\"message_id\":\"m-1\"}}\n\n"
        ));
    }
    body.push_str("data: [DONE]\n\n");
    body.into_bytes()
}

fn decode_all(body: &[u8], read_size: usize) -> usize {
    let mut lines = SseLineDecoder::new();
    let mut decoder = StreamDecoder::new();
    let mut chunks = 0;
    for piece in body.chunks(read_size) {
        for line in lines.push(piece) {
            if decoder.decode_line(&line).is_some() {
                chunks += 1;
            }
        }
    }
    chunks
}

// ─── Benchmarks ─────────────────────────────────────────────────────────────

fn bench_stream_decode(c: &mut Criterion) {
    let body = stream_body(1_000);
    let mut group = c.benchmark_group("stream_decode");
    for read_size in [64usize, 1_024, 16_384] {
        group.bench_with_input(
            BenchmarkId::from_parameter(read_size),
            &read_size,
            |b, &size| b.iter(|| decode_all(black_box(&body), size)),
        );
    }
    group.finish();
}

fn bench_bus_emit(c: &mut Criterion) {
    let bus = EventBus::new();
    let hits = Arc::new(AtomicUsize::new(0));
    for _ in 0..50 {
        let hits = hits.clone();
        bus.on(EventKind::ConnectionStatusChanged, move |_| {
            hits.fetch_add(1, Ordering::Relaxed);
        });
    }
    let event = ClientEvent::ConnectionStatusChanged {
        status: ConnectionStatus::Connected,
    };

    c.bench_function("bus_emit_50_listeners", |b| {
        b.iter(|| bus.emit(black_box(&event)))
    });
}

fn bench_push_parse(c: &mut Criterion) {
    let frame = r#"{"type":"message","data":{"role":"assistant","content":"Done. 3 files changed."},"timestamp":1717000000000,"sessionId":"s-1"}"#;

    c.bench_function("push_update_parse", |b| {
        b.iter(|| serde_json::from_str::<PushUpdate>(black_box(frame)))
    });
}

criterion_group!(benches, bench_stream_decode, bench_bus_emit, bench_push_parse);
criterion_main!(benches);
