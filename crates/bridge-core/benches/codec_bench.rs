//! Criterion benchmarks for the bridge wire-protocol codec.
//!
//! # Purpose
//!
//! `encode_message`/`decode_message` run on every message crossing the wire —
//! once per input event, once per video frame, once per audio packet. These
//! benchmarks measure the envelope codec plus the per-`MessageType` payload
//! codecs for a representative set of message shapes: small fixed-layout
//! payloads (mouse/key events), JSON payloads (handshake/config), and a
//! larger binary payload (a raw BGRA video frame sub-header + pixels).
//!
//! # How to run
//!
//! ```bash
//! cargo bench --package bridge-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use bridge_core::domain::kvm::Edge;
use bridge_core::protocol::codec::{
    decode_message, encode_audio_data, encode_cursor_return, encode_handshake,
    encode_key_event, encode_message, encode_mouse_move, encode_raw_video_frame,
};
use bridge_core::protocol::messages::{
    AudioDataPayload, CursorReturnPayload, HandshakePayload, KeyEventPayload, Message,
    MessageFlags, MessageType, MouseMovePayload, Platform, RawVideoFrame,
};

fn make_heartbeat() -> Message {
    Message::empty(MessageType::Heartbeat)
}

fn make_mouse_move() -> Message {
    let payload = encode_mouse_move(&MouseMovePayload { x: 960, y: 540 });
    Message::new(
        MessageType::MouseMove,
        MessageFlags::NONE.with(MessageFlags::PRIORITY),
        payload,
    )
}

fn make_key_event() -> Message {
    let payload = encode_key_event(&KeyEventPayload { hid_code: 0x04, modifiers: 0b0010 });
    Message::new(
        MessageType::KeyDown,
        MessageFlags::NONE.with(MessageFlags::PRIORITY),
        payload,
    )
}

fn make_cursor_return() -> Message {
    let payload = encode_cursor_return(&CursorReturnPayload {
        edge: Edge::Left,
        normalized_position: 0.42,
    });
    Message::new(MessageType::CursorReturn, MessageFlags::NONE, payload)
}

fn make_handshake() -> Message {
    let payload = encode_handshake(&HandshakePayload {
        app_version: "1.0.0".into(),
        device_name: "bench-host".into(),
        platform: Platform::Windows,
        display_width: 2560,
        display_height: 1440,
        refresh_rate: 144,
        supports_audio: true,
        supports_input: true,
    });
    Message::new(MessageType::Handshake, MessageFlags::NONE, payload)
}

/// A 1920x1080 BGRA keyframe — the largest payload shape on the wire.
fn make_video_keyframe() -> Message {
    let pixels = vec![0xABu8; 1920 * 1080 * 4];
    let payload = encode_raw_video_frame(&RawVideoFrame {
        width: 1920,
        height: 1080,
        stride: 1920 * 4,
        frame_number: 42,
        pixels,
    });
    Message::new(
        MessageType::VideoFrame,
        MessageFlags::NONE.with(MessageFlags::KEY_FRAME),
        payload,
    )
}

/// A 10ms stereo PCM16 packet at 48kHz: 960 frames * 2 channels.
fn make_audio_packet() -> Message {
    let pcm = vec![0i16; 960 * 2];
    let payload = encode_audio_data(&AudioDataPayload { timestamp_us: 123_456, pcm });
    Message::new(MessageType::AudioData, MessageFlags::NONE, payload)
}

fn fixtures() -> Vec<(&'static str, Message)> {
    vec![
        ("Heartbeat", make_heartbeat()),
        ("MouseMove", make_mouse_move()),
        ("KeyEvent", make_key_event()),
        ("CursorReturn", make_cursor_return()),
        ("Handshake", make_handshake()),
        ("AudioPacket", make_audio_packet()),
        ("VideoKeyframe", make_video_keyframe()),
    ]
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_message");
    for (name, msg) in fixtures() {
        group.bench_with_input(BenchmarkId::new("msg", name), &msg, |b, msg| {
            b.iter(|| encode_message(black_box(msg)))
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_message");
    for (name, msg) in fixtures() {
        let bytes = encode_message(&msg);
        group.bench_with_input(BenchmarkId::new("msg", name), &bytes, |b, bytes| {
            b.iter(|| decode_message(black_box(bytes)).expect("decode must succeed"))
        });
    }
    group.finish();
}

/// Full encode+decode round trip for the two highest-frequency message
/// types on the wire: mouse moves (KVM forwarding) and video keyframes
/// (the worst-case payload size).
fn bench_roundtrip_hot_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_decode_roundtrip");

    let mouse_msg = make_mouse_move();
    group.bench_function("MouseMove", |b| {
        b.iter(|| {
            let bytes = encode_message(black_box(&mouse_msg));
            decode_message(black_box(&bytes)).unwrap()
        })
    });

    let video_msg = make_video_keyframe();
    group.bench_function("VideoKeyframe", |b| {
        b.iter(|| {
            let bytes = encode_message(black_box(&video_msg));
            decode_message(black_box(&bytes)).unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_roundtrip_hot_path);
criterion_main!(benches);
